pub mod error;
pub mod settings;

pub use error::*;
pub use settings::*;

use std::path::{Path, PathBuf};

/// プロジェクトルートを直接指定する環境変数
pub const PROJECT_ROOT_ENV: &str = "CVFLOW_PROJECT_ROOT";
/// 設定ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "CVFLOW_CONFIG_PATH";

const CONFIG_CANDIDATES: [&str; 2] = ["cvflow.yaml", ".cvflow.yaml"];

/// プロジェクトルートと設定をまとめたもの
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub settings: ProjectSettings,
}

impl Project {
    pub fn new(root: PathBuf, settings: ProjectSettings) -> Self {
        Self { root, settings }
    }

    /// カレントディレクトリからプロジェクトを探して設定を読み込む
    pub fn discover() -> Result<Self> {
        let root = find_project_root()?;
        let settings = match find_config_file(&root) {
            Some(path) => ProjectSettings::load(&path)?,
            None => {
                tracing::debug!("No cvflow.yaml found, using defaults");
                ProjectSettings::default()
            }
        };
        Ok(Self::new(root, settings))
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join(&self.settings.resources_dir)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.settings.build_dir)
    }

    pub fn resume_src_dir(&self) -> PathBuf {
        self.root.join(&self.settings.resume_src_dir)
    }

    pub fn resume_output_dir(&self) -> PathBuf {
        self.root.join(&self.settings.resume_output_dir)
    }
}

/// プロジェクトルートを探す
///
/// 1. 環境変数 CVFLOW_PROJECT_ROOT
/// 2. カレントディレクトリから親方向に `.git` を含むディレクトリ
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let path = PathBuf::from(root);
        if path.is_dir() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing directory: {}", PROJECT_ROOT_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    find_project_root_from(&current_dir)
}

/// 指定ディレクトリから親方向に `.git` を探す
pub fn find_project_root_from(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::ProjectRootNotFound(start.to_path_buf()))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 CVFLOW_CONFIG_PATH
/// 2. プロジェクトルート: cvflow.yaml, .cvflow.yaml
/// 3. ~/.config/cvflow/cvflow.yaml
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
    }

    for filename in &CONFIG_CANDIDATES {
        let path = root.join(filename);
        if path.exists() {
            return Some(path);
        }
    }

    let global_config = dirs::config_dir()?.join("cvflow").join("cvflow.yaml");
    global_config.exists().then_some(global_config)
}
