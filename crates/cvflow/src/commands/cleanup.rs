use colored::Colorize;
use cvflow_config::Project;
use std::path::{Component, Path, PathBuf};

/// 生成物と一時ファイルを削除
pub fn handle(project: &Project) -> anyhow::Result<bool> {
    let removed = cleanup(
        &project.root,
        &[project.resume_output_dir(), project.build_dir()],
        &project.settings.cleanup_patterns,
    )?;

    for path in &removed {
        println!("  {} {}", "削除:".dimmed(), path.display());
    }
    println!(
        "{} {}件",
        "✓ 一時ファイルを削除しました:".green(),
        removed.len()
    );
    Ok(true)
}

/// `dirs` を削除した後、`root` 以下でパターンに一致するパスを削除する
///
/// `.git` 以下は対象外です。`dirs` にルート自身やルートの外を指すパスが
/// 含まれる場合は何も削除せずにエラーを返します。削除したパスを返します。
pub fn cleanup(root: &Path, dirs: &[PathBuf], patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for dir in dirs {
        if !is_strictly_inside(root, dir) {
            anyhow::bail!(
                "{} はプロジェクトルート {} の配下ではないため削除しません",
                dir.display(),
                root.display()
            );
        }
    }

    for dir in dirs {
        if dir.is_dir() {
            std::fs::remove_dir_all(dir)?;
            removed.push(dir.clone());
        }
    }

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    for pattern in patterns {
        let full_pattern = format!("{}/**/{}", escaped_root, pattern);
        for entry in glob::glob(&full_pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };

            if is_inside_git_dir(root, &path) {
                continue;
            }
            // 親ディレクトリごと削除済みの場合がある
            let Ok(metadata) = std::fs::symlink_metadata(&path) else {
                continue;
            };

            if metadata.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            tracing::debug!("Removed {}", path.display());
            removed.push(path);
        }
    }

    Ok(removed)
}

fn is_strictly_inside(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => {
            relative.components().next().is_some()
                && relative
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

fn is_inside_git_dir(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|component| component == Component::Normal(std::ffi::OsStr::new(".git")))
}
