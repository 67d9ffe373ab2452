mod commands;
mod docker;
mod signal;

use clap::Parser;
use colored::Colorize;
use cvflow_config::Project;
use cvflow_core::{DEFAULT_TASK, TaskRegistry, cli_name};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cv")]
#[command(version)]
#[command(about = "履歴書のビルドを自動化します (Docker + git)", long_about = None)]
struct Cli {
    /// 実行するタスク (省略時は build-all-images)。`cv list` で一覧を表示
    #[arg(value_name = "TASK")]
    tasks: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    signal::spawn_interrupt_handler();

    let project = match Project::discover() {
        Ok(project) => project,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ プロジェクトを読み込めません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Project root: {}", project.root.display());

    let registry = TaskRegistry::standard(
        project.settings.images.iter().map(|image| image.name.as_str()),
        &project.settings.resume_image,
    )?;

    let requested: Vec<String> = if cli.tasks.is_empty() {
        vec![DEFAULT_TASK.to_string()]
    } else {
        cli.tasks.iter().map(|task| cli_name(task)).collect()
    };

    let plan = match registry.execution_plan(requested.as_slice()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            eprintln!();
            eprintln!("{}", "利用可能なタスクは `cv list` で確認できます".yellow());
            std::process::exit(1);
        }
    };

    let mut context = commands::TaskContext::new(project, &registry);
    for task in plan {
        tracing::info!("Running task: {}", task.name);
        match commands::execute(&mut context, task).await {
            Ok(true) => {}
            Ok(false) => {
                eprintln!();
                eprintln!("{} {}", "✗ タスクが失敗しました:".red().bold(), task.name);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!();
                eprintln!("{} {}", "✗ タスクが失敗しました:".red().bold(), task.name);
                eprintln!("  {:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
