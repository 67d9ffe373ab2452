use nix::unistd::{getgid, getuid};

/// cvflow を実行しているホストユーザー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostUser {
    pub uid: u32,
    pub gid: u32,
}

impl HostUser {
    pub fn current() -> Self {
        Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
        }
    }

    /// コンテナの `User` に渡す "uid:gid" 形式
    pub fn user_spec(&self) -> String {
        format!("{}:{}", self.uid, self.gid)
    }
}
