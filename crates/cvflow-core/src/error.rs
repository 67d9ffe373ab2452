use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("git コマンドの実行に失敗しました: {0}")]
    Git(String),

    #[error(
        "ブランチ名を特定できません (detached HEAD)\nヒント: ブランチをチェックアウトするか、{env_var} 環境変数でブランチ名を指定してください"
    )]
    DetachedHead { env_var: String },

    #[error("コミット日時を解析できません: {0}")]
    InvalidCommitDate(String),

    #[error("タスクが見つかりません: {0}")]
    UnknownTask(String),

    #[error("タスク '{0}' は既に登録されています")]
    DuplicateTask(String),

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
