//! Ctrl-C の扱い
//!
//! tokio が一度 SIGINT を捕捉すると、プロセスが終了するデフォルト動作は戻りません。
//! コンテナ実行中は実行側がコンテナを削除して中断を返し、それ以外の間は
//! ここでプロセスを終了します。

use colored::Colorize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// SIGINT で終了した場合の終了コード
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static ACTIVE_CONTAINER_RUNS: AtomicUsize = AtomicUsize::new(0);

/// コンテナ実行中であることを示すガード
///
/// 生存中の Ctrl-C は実行側に任せます。
pub struct ContainerRunGuard {
    _private: (),
}

impl ContainerRunGuard {
    pub fn new() -> Self {
        ACTIVE_CONTAINER_RUNS.fetch_add(1, Ordering::SeqCst);
        Self { _private: () }
    }
}

impl Drop for ContainerRunGuard {
    fn drop(&mut self) {
        ACTIVE_CONTAINER_RUNS.fetch_sub(1, Ordering::SeqCst);
    }
}

fn container_run_active() -> bool {
    ACTIVE_CONTAINER_RUNS.load(Ordering::SeqCst) > 0
}

/// プロセス全体の Ctrl-C 監視を開始
pub fn spawn_interrupt_handler() {
    tokio::spawn(async {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            if container_run_active() {
                tracing::debug!("Ctrl-C during a container run");
                continue;
            }
            eprintln!();
            eprintln!("{}", "✗ 中断しました".red().bold());
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}
