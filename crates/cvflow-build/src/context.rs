use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::{Component, Path};
use tar::Builder;

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// `dockerfile` はコンテキスト内の相対パスで、アーカイブにはそのまま含まれます。
    pub fn create_context(context_path: &Path, dockerfile: &str) -> BuildResult<Vec<u8>> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        if !context_path.is_dir() {
            return Err(BuildError::ContextNotFound(context_path.to_path_buf()));
        }
        let dockerfile_path = context_path.join(Self::normalize_dockerfile(dockerfile)?);
        if !dockerfile_path.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile_path));
        }

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);
            tar.follow_symlinks(false);

            tar.append_dir_all(".", context_path)?;
            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// コンテキスト内のDockerfileパスを正規化 (例: "./Dockerfile" -> "Dockerfile")
    ///
    /// 絶対パスやコンテキスト外を指すパスはエラーです。
    pub fn normalize_dockerfile(dockerfile: &str) -> BuildResult<String> {
        let mut parts = Vec::new();
        for component in Path::new(dockerfile).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                _ => {
                    return Err(BuildError::InvalidConfig(format!(
                        "Dockerfile must be a path inside the build context: {}",
                        dockerfile
                    )));
                }
            }
        }

        if parts.is_empty() {
            return Err(BuildError::InvalidConfig(format!(
                "Invalid Dockerfile path: '{}'",
                dockerfile
            )));
        }

        Ok(parts.join("/"))
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}
