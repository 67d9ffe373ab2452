//! コンテナ内でのコマンド実行
//!
//! コンテナを作成・起動し、出力を行単位で表示して終了を待ちます。
//! 成功・失敗・中断のどの経路でもコンテナは必ず削除されます。

use crate::error::{ContainerError, Result};
use crate::runtime::ContainerEngine;
use cvflow_core::HostUser;
use futures_util::StreamExt;
use std::future::Future;
use std::io::Write;

/// 終了コードが得られなかった場合の値
pub const UNKNOWN_EXIT_CODE: i64 = -1;

/// コンテナで実行するコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    /// 引数リストをそのまま渡す
    Argv(Vec<String>),
    /// `/bin/sh -c` で実行する
    Shell(String),
}

impl RunCommand {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunCommand::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            RunCommand::Argv(args) => args.clone(),
            RunCommand::Shell(script) => {
                vec!["/bin/sh".to_string(), "-c".to_string(), script.clone()]
            }
        }
    }
}

/// バインドマウントのモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    ReadOnly,
    ReadWrite,
}

impl BindMode {
    fn as_str(self) -> &'static str {
        match self {
            BindMode::ReadOnly => "ro",
            BindMode::ReadWrite => "rw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub source: String,
    pub target: String,
    pub mode: BindMode,
}

impl Bind {
    /// `source:target:mode` 形式
    pub fn to_docker_bind(&self) -> String {
        format!("{}:{}:{}", self.source, self.target, self.mode.as_str())
    }
}

/// コンテナ実行の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub command: RunCommand,
    /// コンテナ側のマウントポイント
    pub volumes: Vec<String>,
    pub binds: Vec<Bind>,
    pub privileged: bool,
    user: Option<HostUser>,
}

impl RunSpec {
    pub fn new(image: impl Into<String>, command: RunCommand) -> Self {
        Self {
            image: image.into(),
            command,
            volumes: Vec::new(),
            binds: Vec::new(),
            privileged: false,
            user: None,
        }
    }

    /// バインドマウントを追加 (マウントポイントも登録される)
    pub fn bind(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        mode: BindMode,
    ) -> Self {
        let target = target.into();
        self.volumes.push(target.clone());
        self.binds.push(Bind {
            source: source.into(),
            target,
            mode,
        });
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn run_as(mut self, user: HostUser) -> Self {
        self.user = Some(user);
        self
    }

    /// コンテナのユーザー指定
    ///
    /// 特権コンテナはイメージ既定のユーザーで動かし、それ以外はホストユーザーで動かします。
    pub fn user_spec(&self) -> Option<String> {
        if self.privileged {
            None
        } else {
            self.user.map(|user| user.user_spec())
        }
    }
}

/// 改行が来るまで出力を溜めておくバッファ
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンクを追加し、完成した行を書き出す
    pub fn push<W: Write>(&mut self, chunk: &[u8], out: &mut W) -> std::io::Result<()> {
        self.pending.extend_from_slice(chunk);
        if let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') {
            let rest = self.pending.split_off(last_newline + 1);
            out.write_all(&self.pending)?;
            out.flush()?;
            self.pending = rest;
        }
        Ok(())
    }

    /// 残りを改行付きで書き出す
    pub fn finish<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            out.write_all(&self.pending)?;
            out.write_all(b"\n")?;
            out.flush()?;
            self.pending.clear();
        }
        Ok(())
    }
}

/// コンテナでコマンドを実行し、終了コードが0なら `true` を返す
///
/// Ctrl-C を受け取った場合もコンテナを削除してから `Interrupted` を返します。
pub async fn run_in_container<E, W>(engine: &E, spec: &RunSpec, out: &mut W) -> Result<bool>
where
    E: ContainerEngine,
    W: Write,
{
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_in_container_until(engine, spec, out, interrupt).await
}

/// `interrupt` が完了した時点で実行を打ち切る版
pub async fn run_in_container_until<E, W, F>(
    engine: &E,
    spec: &RunSpec,
    out: &mut W,
    interrupt: F,
) -> Result<bool>
where
    E: ContainerEngine,
    W: Write,
    F: Future<Output = ()>,
{
    let id = engine.create_container(spec).await?;
    tracing::debug!("Created container {} from {}", id, spec.image);

    let outcome = tokio::select! {
        result = drive(engine, &id, out) => result,
        _ = interrupt => {
            tracing::info!("Interrupted, removing container {}", id);
            Err(ContainerError::Interrupted)
        }
    };

    let removed = engine.remove_container(&id).await;
    tracing::debug!("Removed container {}", id);

    match (outcome, removed) {
        (Ok(exit_code), Ok(())) => {
            tracing::debug!("Container {} exited with {}", id, exit_code);
            Ok(exit_code == 0)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(remove_err)) => {
            tracing::warn!("Failed to remove container {}: {}", id, remove_err);
            Err(e)
        }
    }
}

async fn drive<E, W>(engine: &E, id: &str, out: &mut W) -> Result<i64>
where
    E: ContainerEngine,
    W: Write,
{
    engine.start_container(id).await?;

    let mut lines = LineBuffer::new();
    {
        let mut logs = engine.log_stream(id);
        while let Some(chunk) = logs.next().await {
            lines.push(&chunk?, out)?;
        }
    }
    lines.finish(out)?;

    let exit_code = engine.wait_container(id).await?;
    Ok(exit_code.unwrap_or(UNKNOWN_EXIT_CODE))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::runtime::ImageEntry;
    use futures_util::stream::{self, BoxStream};
    use std::sync::Mutex;

    /// 呼び出しを記録するエンジン
    #[derive(Default)]
    pub(crate) struct FakeEngine {
        pub calls: Mutex<Vec<String>>,
        pub chunks: Vec<&'static str>,
        pub exit_code: Option<i64>,
        pub fail_start: bool,
        pub fail_logs: bool,
        pub fail_wait: bool,
        pub fail_remove: bool,
        pub hang_wait: bool,
        pub containers: Vec<String>,
        pub images: Vec<ImageEntry>,
    }

    impl FakeEngine {
        pub fn exiting_with(exit_code: i64) -> Self {
            Self {
                exit_code: Some(exit_code),
                ..Default::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }
    }

    fn api_error(what: &str) -> ContainerError {
        ContainerError::DockerApiError(what.to_string())
    }

    impl ContainerEngine for FakeEngine {
        async fn create_container(&self, spec: &RunSpec) -> Result<String> {
            self.record(format!("create {}", spec.image));
            Ok("c0ffee".to_string())
        }

        async fn start_container(&self, id: &str) -> Result<()> {
            self.record(format!("start {}", id));
            if self.fail_start {
                return Err(api_error("start failed"));
            }
            Ok(())
        }

        fn log_stream(&self, id: &str) -> BoxStream<'_, Result<Vec<u8>>> {
            self.record(format!("logs {}", id));
            let mut items: Vec<Result<Vec<u8>>> = self
                .chunks
                .iter()
                .map(|chunk| Ok(chunk.as_bytes().to_vec()))
                .collect();
            if self.fail_logs {
                items.push(Err(api_error("log stream broken")));
            }
            stream::iter(items).boxed()
        }

        async fn wait_container(&self, id: &str) -> Result<Option<i64>> {
            self.record(format!("wait {}", id));
            if self.hang_wait {
                std::future::pending::<()>().await;
            }
            if self.fail_wait {
                return Err(api_error("wait failed"));
            }
            Ok(self.exit_code)
        }

        async fn remove_container(&self, id: &str) -> Result<()> {
            self.record(format!("remove {}", id));
            if self.fail_remove {
                return Err(api_error("remove failed"));
            }
            Ok(())
        }

        async fn list_containers_by_name(&self, name: &str) -> Result<Vec<String>> {
            self.record(format!("list-containers {}", name));
            Ok(self.containers.clone())
        }

        async fn list_images(&self, reference: &str) -> Result<Vec<ImageEntry>> {
            self.record(format!("list-images {}", reference));
            Ok(self.images.clone())
        }

        async fn remove_image(&self, id: &str) -> Result<()> {
            self.record(format!("remove-image {}", id));
            Ok(())
        }
    }

    fn spec() -> RunSpec {
        RunSpec::new(
            "cv-toollatex:master-2019-01-07-3f2a9c1",
            RunCommand::argv(["latexmk", "-pdfxe"]),
        )
    }

    async fn run(engine: &FakeEngine) -> (Result<bool>, String) {
        let mut out = Vec::new();
        let result =
            run_in_container_until(engine, &spec(), &mut out, std::future::pending()).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_successful_run() {
        let engine = FakeEngine {
            chunks: vec!["Latexmk: applying rule\n", "Output written on main.pdf\n"],
            ..FakeEngine::exiting_with(0)
        };

        let (result, output) = run(&engine).await;
        assert!(result.unwrap());
        assert_eq!(output, "Latexmk: applying rule\nOutput written on main.pdf\n");
        assert_eq!(
            engine.calls(),
            vec![
                "create cv-toollatex:master-2019-01-07-3f2a9c1",
                "start c0ffee",
                "logs c0ffee",
                "wait c0ffee",
                "remove c0ffee",
            ]
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_returns_false() {
        let engine = FakeEngine::exiting_with(12);

        let (result, _) = run(&engine).await;
        assert!(!result.unwrap());
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_missing_exit_code_is_a_failure() {
        let engine = FakeEngine::default();

        let (result, _) = run(&engine).await;
        assert!(!result.unwrap());
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_start_error_still_removes() {
        let engine = FakeEngine {
            fail_start: true,
            ..FakeEngine::exiting_with(0)
        };

        let (result, _) = run(&engine).await;
        assert!(matches!(result, Err(ContainerError::DockerApiError(msg)) if msg == "start failed"));
        assert_eq!(engine.count("logs"), 0);
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_log_error_still_removes() {
        let engine = FakeEngine {
            chunks: vec!["partial"],
            fail_logs: true,
            ..FakeEngine::exiting_with(0)
        };

        let (result, _) = run(&engine).await;
        assert!(result.is_err());
        assert_eq!(engine.count("wait"), 0);
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_wait_error_still_removes() {
        let engine = FakeEngine {
            fail_wait: true,
            ..FakeEngine::exiting_with(0)
        };

        let (result, _) = run(&engine).await;
        assert!(matches!(result, Err(ContainerError::DockerApiError(msg)) if msg == "wait failed"));
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_interrupt_removes_container() {
        let engine = FakeEngine {
            hang_wait: true,
            ..FakeEngine::exiting_with(0)
        };

        let mut out = Vec::new();
        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(20));
        let result = run_in_container_until(&engine, &spec(), &mut out, interrupt).await;

        assert!(matches!(result, Err(ContainerError::Interrupted)));
        assert_eq!(engine.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_primary_error_wins_over_removal_error() {
        let engine = FakeEngine {
            fail_start: true,
            fail_remove: true,
            ..FakeEngine::exiting_with(0)
        };

        let (result, _) = run(&engine).await;
        assert!(matches!(result, Err(ContainerError::DockerApiError(msg)) if msg == "start failed"));
    }

    #[tokio::test]
    async fn test_removal_error_after_success_propagates() {
        let engine = FakeEngine {
            fail_remove: true,
            ..FakeEngine::exiting_with(0)
        };

        let (result, _) = run(&engine).await;
        assert!(matches!(result, Err(ContainerError::DockerApiError(msg)) if msg == "remove failed"));
    }

    #[tokio::test]
    async fn test_trailing_partial_line_is_flushed() {
        let engine = FakeEngine {
            chunks: vec!["Runn", "ing\nlast line without newline"],
            ..FakeEngine::exiting_with(0)
        };

        let (result, output) = run(&engine).await;
        assert!(result.unwrap());
        assert_eq!(output, "Running\nlast line without newline\n");
    }

    #[test]
    fn test_line_buffer_holds_partial_lines() {
        let mut buffer = LineBuffer::new();
        let mut out = Vec::new();

        buffer.push(b"abc", &mut out).unwrap();
        assert!(out.is_empty());

        buffer.push(b"def\nghi\njk", &mut out).unwrap();
        assert_eq!(out, b"abcdef\nghi\n");

        buffer.finish(&mut out).unwrap();
        assert_eq!(out, b"abcdef\nghi\njk\n");

        buffer.finish(&mut out).unwrap();
        assert_eq!(out, b"abcdef\nghi\njk\n");
    }

    #[test]
    fn test_user_spec_only_when_not_privileged() {
        let host = HostUser { uid: 1000, gid: 1000 };

        let spec = spec().run_as(host);
        assert_eq!(spec.user_spec(), Some("1000:1000".to_string()));

        let privileged = spec.privileged(true);
        assert_eq!(privileged.user_spec(), None);
    }

    #[test]
    fn test_bind_registers_volume() {
        let spec = spec()
            .bind("/repo/resumé", "/code", BindMode::ReadOnly)
            .bind("/repo/build/resumé", "/_/output", BindMode::ReadWrite);

        assert_eq!(spec.volumes, vec!["/code", "/_/output"]);
        assert_eq!(spec.binds[0].to_docker_bind(), "/repo/resumé:/code:ro");
        assert_eq!(spec.binds[1].to_docker_bind(), "/repo/build/resumé:/_/output:rw");
    }

    #[test]
    fn test_shell_command() {
        let command = RunCommand::Shell("make && make install".to_string());
        assert_eq!(command.to_args(), vec!["/bin/sh", "-c", "make && make install"]);
    }
}
