pub mod cleanup;
pub mod image;
pub mod info;
pub mod resume;

use crate::docker;
use colored::Colorize;
use cvflow_config::Project;
use cvflow_core::{GitRepo, Task, TaskKind, TaskRegistry, Version, VersionResolver};

/// タスク実行中に共有する状態
///
/// バージョンとDocker接続は最初に必要になった時点で一度だけ用意します。
pub struct TaskContext<'a> {
    pub project: Project,
    pub registry: &'a TaskRegistry,
    version: Option<Version>,
    docker: Option<bollard::Docker>,
}

impl<'a> TaskContext<'a> {
    pub fn new(project: Project, registry: &'a TaskRegistry) -> Self {
        Self {
            project,
            registry,
            version: None,
            docker: None,
        }
    }

    pub fn version(&mut self) -> anyhow::Result<Version> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }

        let repo = GitRepo::open(&self.project.root)?;
        let resolver = VersionResolver::new(repo, &self.project.settings.branch_env_var);
        let version = resolver.resolve()?;
        self.version = Some(version.clone());
        Ok(version)
    }

    pub async fn docker(&mut self) -> anyhow::Result<bollard::Docker> {
        if let Some(docker) = &self.docker {
            return Ok(docker.clone());
        }

        let docker = docker::init_docker_with_error_handling().await?;
        self.docker = Some(docker.clone());
        Ok(docker)
    }
}

/// タスクを1つ実行する。失敗した場合は `Ok(false)`
pub async fn execute(context: &mut TaskContext<'_>, task: &Task) -> anyhow::Result<bool> {
    match &task.kind {
        TaskKind::BuildImage(image) => image::build(context, image).await,
        TaskKind::CleanImage(image) => image::clean(context, image).await,
        TaskKind::BuildAllImages => {
            println!("{}", "✓ すべてのイメージをビルドしました".green());
            Ok(true)
        }
        TaskKind::CleanImages => {
            println!("{}", "✓ 不要なコンテナとイメージを削除しました".green());
            Ok(true)
        }
        TaskKind::Resume => resume::handle(context).await,
        TaskKind::Cleanup => cleanup::handle(&context.project),
        TaskKind::GetVersion => {
            let version = context.version()?;
            println!("{}", version);
            Ok(true)
        }
        TaskKind::List => {
            info::print_tasks(context.registry, &mut std::io::stdout())?;
            Ok(true)
        }
    }
}
