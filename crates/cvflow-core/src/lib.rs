//! cvflow core
//!
//! git から導出するバージョン、イメージ名の規約、ホストユーザー情報、
//! タスクレジストリを提供します。

pub mod error;
pub mod host;
pub mod naming;
pub mod task;
pub mod version;

pub use error::*;
pub use host::HostUser;
pub use naming::*;
pub use task::{DEFAULT_TASK, Task, TaskKind, TaskRegistry};
pub use version::{GitRepo, HeadCommit, Version, VersionResolver};
