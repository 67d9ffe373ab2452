use super::TaskContext;
use colored::Colorize;
use cvflow_build::{BuildResolver, ImageBuilder};
use cvflow_container::DockerEngine;
use cvflow_core::HostUser;

/// イメージをビルド
pub async fn build(context: &mut TaskContext<'_>, image_name: &str) -> anyhow::Result<bool> {
    let image = context
        .project
        .settings
        .images
        .iter()
        .find(|image| image.name == image_name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("イメージ '{}' は設定されていません", image_name))?;

    let version = context.version()?;
    let request = BuildResolver::new(&context.project)
        .resolve_request(&image, &version, HostUser::current())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!();
    println!(
        "{} {}",
        "イメージをビルド中:".green(),
        request.image_name.cyan()
    );

    let builder = ImageBuilder::new(context.docker().await?);
    let succeeded = builder
        .build(&request, &mut std::io::stdout())
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if succeeded {
        println!("{} {}", "✓ ビルド完了:".green(), request.image_name);
    }
    Ok(succeeded)
}

/// イメージに関連する古いコンテナとイメージを削除
pub async fn clean(context: &mut TaskContext<'_>, image_name: &str) -> anyhow::Result<bool> {
    let engine = DockerEngine::new(context.docker().await?);
    let report = cvflow_container::clean_image(
        &engine,
        &context.project.settings.project_prefix,
        image_name,
        &mut std::io::stdout(),
    )
    .await?;

    if report.containers.is_empty() && report.images.is_empty() {
        println!("{} {}", "削除対象はありません:".dimmed(), image_name);
    }
    Ok(true)
}
