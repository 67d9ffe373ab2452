use crate::error::Result;
use crate::runner::RunSpec;
use futures_util::stream::BoxStream;

/// コンテナエンジンのトレイト
///
/// 実行ドライバとイメージクリーナーはこのトレイト越しにエンジンを操作します。
#[allow(async_fn_in_trait)]
pub trait ContainerEngine {
    /// コンテナを作成してIDを返す
    async fn create_container(&self, spec: &RunSpec) -> Result<String>;
    async fn start_container(&self, id: &str) -> Result<()>;
    /// stdout/stderr を合わせた出力をチャンク単位で返す
    fn log_stream(&self, id: &str) -> BoxStream<'_, Result<Vec<u8>>>;
    /// コンテナの終了を待つ。終了コードが得られなければ `None`
    async fn wait_container(&self, id: &str) -> Result<Option<i64>>;
    /// ボリュームごと強制削除
    async fn remove_container(&self, id: &str) -> Result<()>;
    /// 名前フィルタに一致するコンテナのID (停止中を含む)
    async fn list_containers_by_name(&self, name: &str) -> Result<Vec<String>>;
    /// リファレンスに一致するイメージ
    async fn list_images(&self, reference: &str) -> Result<Vec<ImageEntry>>;
    /// イメージを強制削除
    async fn remove_image(&self, id: &str) -> Result<()>;
}

/// イメージ一覧の1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub id: String,
    /// 作成日時 (UNIX秒)
    pub created: i64,
}
