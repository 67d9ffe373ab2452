use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: git リポジトリ内で実行するか、CVFLOW_PROJECT_ROOT 環境変数で指定してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("設定ファイルの解析に失敗しました: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
