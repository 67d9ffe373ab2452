//! 古いコンテナとイメージの削除

use crate::error::Result;
use crate::runtime::ContainerEngine;
use cvflow_core::full_image_name;
use std::io::Write;

/// 削除したコンテナとイメージのID
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub containers: Vec<String>,
    pub images: Vec<String>,
}

/// イメージに関連するコンテナを削除し、最新以外のイメージを削除する
pub async fn clean_image<E, W>(
    engine: &E,
    prefix: &str,
    image: &str,
    out: &mut W,
) -> Result<CleanReport>
where
    E: ContainerEngine,
    W: Write,
{
    let name = full_image_name(prefix, image);
    let mut report = CleanReport::default();

    for id in engine.list_containers_by_name(&name).await? {
        engine.remove_container(&id).await?;
        writeln!(out, "{} container removed", id)?;
        report.containers.push(id);
    }

    let mut images = engine.list_images(&name).await?;
    images.sort_by_key(|entry| entry.created);
    // 最新のイメージは残す
    images.pop();

    for entry in images {
        engine.remove_image(&entry.id).await?;
        writeln!(out, "{} - {} image removed", image, entry.id)?;
        report.images.push(entry.id);
    }

    tracing::info!(
        "Cleaned {}: {} containers, {} images",
        name,
        report.containers.len(),
        report.images.len()
    );
    Ok(report)
}
