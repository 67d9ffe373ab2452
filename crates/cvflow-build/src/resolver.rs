use crate::builder::{BuildRequest, compose_build_args};
use crate::context::ContextBuilder;
use crate::error::{BuildError, BuildResult};
use cvflow_config::{ImageSettings, Project};
use cvflow_core::{HostUser, Version, tagged_image_name};
use std::path::PathBuf;

/// イメージ設定からビルド要求を組み立てる
pub struct BuildResolver {
    project_root: PathBuf,
    project_prefix: String,
    version_env_var: String,
}

impl BuildResolver {
    pub fn new(project: &Project) -> Self {
        Self {
            project_root: project.root.clone(),
            project_prefix: project.settings.project_prefix.clone(),
            version_env_var: project.settings.version_env_var.clone(),
        }
    }

    /// ビルドコンテキストのパスを解決
    pub fn resolve_context(&self, image: &ImageSettings) -> BuildResult<PathBuf> {
        let context = self.project_root.join(&image.context);

        if !context.exists() {
            return Err(BuildError::ContextNotFound(context));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        Ok(context)
    }

    pub fn resolve_request(
        &self,
        image: &ImageSettings,
        version: &Version,
        host: HostUser,
    ) -> BuildResult<BuildRequest> {
        let context_dir = self.resolve_context(image)?;
        let dockerfile = ContextBuilder::normalize_dockerfile(&image.dockerfile)?;
        if !context_dir.join(&dockerfile).is_file() {
            return Err(BuildError::DockerfileNotFound(context_dir.join(&dockerfile)));
        }

        for key in image.build_args.keys() {
            self.validate_build_arg(key);
        }

        Ok(BuildRequest {
            image_name: tagged_image_name(&self.project_prefix, &image.name, version),
            context_dir,
            dockerfile,
            build_args: compose_build_args(
                host,
                &self.version_env_var,
                &version.to_string(),
                &image.build_args,
            ),
        })
    }

    /// ビルド引数の検証（機密情報の警告）
    pub fn validate_build_arg(&self, key: &str) {
        let sensitive_patterns = ["password", "token", "secret", "api_key", "private_key"];

        let key_lower = key.to_lowercase();
        if sensitive_patterns
            .iter()
            .any(|pattern| key_lower.contains(pattern))
        {
            tracing::warn!(
                "警告: ビルド引数 '{}' は機密情報を含む可能性があります。\n\
                 ビルド引数はイメージ履歴に記録されます。",
                key
            );
        }
    }
}
