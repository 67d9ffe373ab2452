//! bollard による `ContainerEngine` の実装

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{ContainerError, Result};
use crate::runner::RunSpec;
use crate::runtime::{ContainerEngine, ImageEntry};
use bollard::Docker;
use bollard::container::{Config, ListContainersOptions};
use bollard::image::ListImagesOptions;
use bollard::models::HostConfig;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::collections::HashMap;

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

/// RunSpec を Docker のコンテナ設定に変換
pub fn run_spec_to_config(spec: &RunSpec) -> Config<String> {
    let volumes: HashMap<String, HashMap<(), ()>> = spec
        .volumes
        .iter()
        .map(|target| (target.clone(), HashMap::new()))
        .collect();

    let binds: Vec<String> = spec.binds.iter().map(|b| b.to_docker_bind()).collect();

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.command.to_args()),
        user: spec.user_spec(),
        tty: Some(true),
        open_stdin: Some(true),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        volumes: if volumes.is_empty() { None } else { Some(volumes) },
        host_config: Some(HostConfig {
            binds: if binds.is_empty() { None } else { Some(binds) },
            privileged: Some(spec.privileged),
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl ContainerEngine for DockerEngine {
    async fn create_container(&self, spec: &RunSpec) -> Result<String> {
        tracing::debug!("Creating container from {}", spec.image);
        match self
            .docker
            .create_container(
                None::<bollard::query_parameters::CreateContainerOptions>,
                run_spec_to_config(spec),
            )
            .await
        {
            Ok(response) => Ok(response.id),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ContainerError::ImageNotFound {
                image: spec.image.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        tracing::debug!("Starting container {}", id);
        self.docker
            .start_container(id, None::<bollard::query_parameters::StartContainerOptions>)
            .await?;
        Ok(())
    }

    fn log_stream(&self, id: &str) -> BoxStream<'_, Result<Vec<u8>>> {
        let options = bollard::query_parameters::LogsOptions {
            follow: true,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        self.docker
            .logs(id, Some(options))
            .map(|chunk| {
                chunk
                    .map(|output| output.into_bytes().to_vec())
                    .map_err(ContainerError::from)
            })
            .boxed()
    }

    async fn wait_container(&self, id: &str) -> Result<Option<i64>> {
        tracing::debug!("Waiting for container {}", id);
        let mut stream = self
            .docker
            .wait_container(id, None::<bollard::query_parameters::WaitContainerOptions>);

        match stream.next().await {
            Some(Ok(response)) => Ok(Some(response.status_code)),
            // 非ゼロ終了はエラーとして返ってくる
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => {
                Ok(Some(code))
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        tracing::debug!("Removing container {}", id);
        self.docker
            .remove_container(
                id,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn list_containers_by_name(&self, name: &str) -> Result<Vec<String>> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: HashMap::from([("name".to_string(), vec![name.to_string()])]),
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<ImageEntry>> {
        let options = ListImagesOptions::<String> {
            all: true,
            filters: HashMap::from([("reference".to_string(), vec![reference.to_string()])]),
            ..Default::default()
        };

        let images = self.docker.list_images(Some(options)).await?;
        Ok(images
            .into_iter()
            .map(|image| ImageEntry {
                id: image.id,
                created: image.created,
            })
            .collect())
    }

    async fn remove_image(&self, id: &str) -> Result<()> {
        tracing::debug!("Removing image {}", id);
        self.docker
            .remove_image(
                id,
                Some(bollard::query_parameters::RemoveImageOptions {
                    force: true,
                    ..Default::default()
                }),
                None,
            )
            .await?;
        Ok(())
    }
}
