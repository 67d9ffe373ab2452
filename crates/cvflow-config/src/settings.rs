//! プロジェクト設定 (cvflow.yaml)
//!
//! すべてのフィールドにデフォルト値があるため、設定ファイルが無くても動作します。

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// ビルド対象イメージの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// イメージの短い識別子 (例: "toollatex")
    pub name: String,
    /// プロジェクトルートからのビルドコンテキストのパス
    pub context: PathBuf,
    /// コンテキスト内のDockerfileのパス
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    /// 追加のビルド引数
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
}

fn default_dockerfile() -> String {
    "./Dockerfile".to_string()
}

/// プロジェクト全体の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// イメージ名の接頭辞 (小文字化して使用)
    pub project_prefix: String,
    /// コンテナビルドに渡すバージョン変数名
    pub version_env_var: String,
    /// CIが提供するブランチ名の環境変数
    pub branch_env_var: String,
    pub resources_dir: PathBuf,
    pub build_dir: PathBuf,
    pub resume_src_dir: PathBuf,
    pub resume_output_dir: PathBuf,
    pub images: Vec<ImageSettings>,
    /// resume タスクでLaTeXを実行するイメージ
    pub resume_image: String,
    /// cleanup タスクで削除するファイル名パターン
    pub cleanup_patterns: Vec<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project_prefix: "CV".to_string(),
            version_env_var: "CV_VERSION".to_string(),
            branch_env_var: "CI_COMMIT_REF_NAME".to_string(),
            resources_dir: PathBuf::from("resources"),
            build_dir: PathBuf::from("build"),
            resume_src_dir: PathBuf::from("resumé"),
            resume_output_dir: PathBuf::from("build/resumé"),
            images: vec![ImageSettings {
                name: "toollatex".to_string(),
                context: PathBuf::from("contrib/toollatex"),
                dockerfile: default_dockerfile(),
                build_args: BTreeMap::new(),
            }],
            resume_image: "toollatex".to_string(),
            cleanup_patterns: vec![
                "*~".to_string(),
                "*.pyc".to_string(),
                "__pycache__".to_string(),
            ],
        }
    }
}

impl ProjectSettings {
    /// YAMLファイルから設定を読み込む
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: ProjectSettings =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// 設定の整合性を検証
    pub fn validate(&self) -> Result<()> {
        if self.project_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "project_prefix が空です".to_string(),
            ));
        }

        for (field, dir) in [
            ("resources_dir", &self.resources_dir),
            ("build_dir", &self.build_dir),
            ("resume_src_dir", &self.resume_src_dir),
            ("resume_output_dir", &self.resume_output_dir),
        ] {
            validate_project_dir(field, dir)?;
        }

        let mut seen = std::collections::HashSet::new();
        for image in &self.images {
            if image.name.is_empty()
                || image
                    .name
                    .chars()
                    .any(|c| c == ':' || c == '/' || c.is_whitespace())
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "イメージ名 '{}' は使用できません",
                    image.name
                )));
            }
            if !seen.insert(image.name.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "イメージ '{}' が重複しています",
                    image.name
                )));
            }
        }

        if !self.images.iter().any(|image| image.name == self.resume_image) {
            return Err(ConfigError::InvalidConfig(format!(
                "resume_image '{}' が images に定義されていません",
                self.resume_image
            )));
        }

        Ok(())
    }
}

/// プロジェクトルート配下を指す相対パスか検証
///
/// `cleanup` はこれらのディレクトリを再帰的に削除するため、
/// ルート自身やルートの外を指すパスは受け付けません。
fn validate_project_dir(field: &str, dir: &Path) -> Result<()> {
    let inside_root = dir.components().next().is_some()
        && dir
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !inside_root {
        return Err(ConfigError::InvalidConfig(format!(
            "{} '{}' はプロジェクトルート配下の相対パスで指定してください",
            field,
            dir.display()
        )));
    }
    Ok(())
}
