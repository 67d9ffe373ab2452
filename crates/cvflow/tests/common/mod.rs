use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    /// 設定ファイルだけを持つプロジェクト
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("cvflow.yaml"), "project_prefix: CV\n").unwrap();
        Self { root }
    }

    /// コミットが1つある git リポジトリ
    #[allow(dead_code)]
    pub fn with_git() -> Self {
        let project = Self::new();
        project.git(&["init", "-q"]);
        project.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        project.git(&["config", "user.name", "test-user"]);
        project.git(&["config", "user.email", "test@example.com"]);
        project.git(&[
            "commit",
            "-q",
            "--allow-empty",
            "-m",
            "initial",
            "--date",
            "2024-03-05T23:30:00+09:00",
        ]);
        project
    }

    pub fn git(&self, args: &[&str]) {
        let output = process::Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    #[allow(dead_code)]
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path().join(relative).exists()
    }

    /// このプロジェクトを対象に `cv` を実行するコマンド
    #[allow(deprecated)]
    pub fn cv(&self) -> Command {
        let mut cmd = Command::cargo_bin("cv").unwrap();
        cmd.current_dir(self.path())
            .env("CVFLOW_PROJECT_ROOT", self.path())
            .env("CVFLOW_CONFIG_PATH", self.path().join("cvflow.yaml"))
            .env_remove("CI_COMMIT_REF_NAME")
            .env_remove("RUST_LOG");
        cmd
    }
}
