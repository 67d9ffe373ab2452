use super::TaskContext;
use colored::Colorize;
use cvflow_config::Project;
use cvflow_container::{BindMode, DockerEngine, RunCommand, RunSpec, run_in_container};
use cvflow_core::{HostUser, tagged_image_name};
use std::path::Path;

const LATEX_COMMAND: [&str; 7] = [
    "latexmk",
    "-f",
    "-pdfxe",
    "-xelatex",
    "-shell-escape",
    "-output-directory=output",
    "-jobname=main",
];

/// 履歴書をPDFにビルド
pub async fn handle(context: &mut TaskContext<'_>) -> anyhow::Result<bool> {
    let output_dir = context.project.resume_output_dir();
    std::fs::create_dir_all(&output_dir)?;

    let version = context.version()?;
    let image = tagged_image_name(
        &context.project.settings.project_prefix,
        &context.project.settings.resume_image,
        &version,
    );
    let spec = resume_run_spec(&context.project, &image)?;

    println!();
    println!("{} {}", "履歴書をビルド中:".green(), image.cyan());

    let engine = DockerEngine::new(context.docker().await?);
    let succeeded = {
        let _running = crate::signal::ContainerRunGuard::new();
        run_in_container(&engine, &spec, &mut std::io::stdout()).await?
    };

    if succeeded {
        println!(
            "{} {}",
            "✓ PDFを出力しました:".green(),
            output_dir.join("main.pdf").display()
        );
    }
    Ok(succeeded)
}

fn host_path(path: &Path) -> anyhow::Result<String> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| anyhow::anyhow!("{} を開けません: {}", path.display(), e))?;
    Ok(absolute.to_string_lossy().into_owned())
}

/// LaTeX のコンパイルを行うコンテナの設定
pub fn resume_run_spec(project: &Project, image: &str) -> anyhow::Result<RunSpec> {
    Ok(RunSpec::new(image, RunCommand::argv(LATEX_COMMAND))
        .bind(host_path(&project.resume_src_dir())?, "/code", BindMode::ReadOnly)
        .bind(
            host_path(&project.resources_dir())?,
            "/_/resources",
            BindMode::ReadOnly,
        )
        .bind(
            host_path(&project.resume_output_dir())?,
            "/_/output",
            BindMode::ReadWrite,
        )
        .privileged(true)
        .run_as(HostUser::current()))
}
