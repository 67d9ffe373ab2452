use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "Dockerに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • DOCKER_HOST の設定を確認してください"
    )]
    DockerConnectionFailed(String),

    #[error(
        "イメージ '{image}' が見つかりません\n\nヒント:\n  • 先にイメージをビルドしてください: cv build-all-images"
    )]
    ImageNotFound { image: String },

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),

    #[error("中断されました")]
    Interrupted,

    #[error("出力エラー: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        match &err {
            bollard::errors::Error::DockerResponseServerError { .. } => {
                // 404/409 などのステータスは呼び出し側で判断する
                ContainerError::DockerApiError(err.to_string())
            }
            _ => {
                // 接続エラーの可能性をチェック
                let err_str = err.to_string();
                if err_str.contains("Connection refused")
                    || err_str.contains("No such file or directory")
                {
                    ContainerError::DockerConnectionFailed(err_str)
                } else {
                    ContainerError::DockerApiError(err_str)
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
