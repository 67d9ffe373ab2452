use crate::context::ContextBuilder;
use crate::error::{BuildError, BuildResult};
use crate::progress::interpret_build_output;
use crate::status::StatusRecord;
use bollard::Docker;
use cvflow_core::HostUser;
use futures_util::stream::{Stream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;

/// ビルド要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// タグ付きのイメージ名
    pub image_name: String,
    pub context_dir: PathBuf,
    /// コンテキスト内のDockerfileのパス
    pub dockerfile: String,
    pub build_args: HashMap<String, String>,
}

/// ビルド引数を組み立てる
///
/// ホストユーザーの UID/GID とバージョンを常に含めます。
/// `extra` に同じキーがあればそちらが優先されます。
pub fn compose_build_args(
    host: HostUser,
    version_env_var: &str,
    version: &str,
    extra: &BTreeMap<String, String>,
) -> HashMap<String, String> {
    let mut args = HashMap::from([
        ("HOST_USER_UID".to_string(), host.uid.to_string()),
        ("HOST_USER_GID".to_string(), host.gid.to_string()),
        (version_env_var.to_string(), version.to_string()),
    ]);
    args.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    args
}

pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// ビルドを開始し、ステータスレコードのストリームを返す
    ///
    /// コンテキストの作成に失敗した場合はエンジンに接続する前にエラーになります。
    pub fn start_build(
        &self,
        request: &BuildRequest,
    ) -> BuildResult<impl Stream<Item = BuildResult<StatusRecord>> + '_> {
        tracing::info!("Building image: {}", request.image_name);

        let context_data = ContextBuilder::create_context(&request.context_dir, &request.dockerfile)?;

        // Bollard 0.19 の非推奨APIを一時的に使用
        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions::<String> {
            dockerfile: request.dockerfile.clone(),
            t: request.image_name.clone(),
            buildargs: request.build_args.clone(),
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            ..Default::default()
        };

        tracing::debug!("Build args: {:?}", request.build_args);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));

        #[allow(deprecated)]
        let stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)))
            .map(|result| match result {
                Ok(info) => Ok(StatusRecord::from(info)),
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    Ok(StatusRecord::Error(error))
                }
                Err(e) => Err(BuildError::DockerConnection(e)),
            });

        Ok(stream)
    }

    /// イメージをビルドして進捗を `out` に表示
    ///
    /// ビルドが失敗した場合は `Ok(false)` を返します。
    pub async fn build<W: Write>(&self, request: &BuildRequest, out: &mut W) -> BuildResult<bool> {
        let records = self.start_build(request)?;
        let succeeded = interpret_build_output(records, out).await?;

        if succeeded {
            tracing::info!("Successfully built: {}", request.image_name);
        } else {
            tracing::warn!("Build failed: {}", request.image_name);
        }
        Ok(succeeded)
    }

}
