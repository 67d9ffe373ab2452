//! タスクレジストリ
//!
//! 起動時に一度だけ構築し、参照で受け渡します。
//! `build-all-images` と `clean-images` の依存は登録済みのイメージタスクから導出されます。

use crate::error::{CoreError, Result};
use crate::naming::cli_name;
use std::collections::HashMap;

/// 引数なしで実行した場合のタスク
pub const DEFAULT_TASK: &str = "build-all-images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// イメージをビルド (値はイメージの短い識別子)
    BuildImage(String),
    /// 古いコンテナとイメージを削除
    CleanImage(String),
    BuildAllImages,
    CleanImages,
    Resume,
    Cleanup,
    GetVersion,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub kind: TaskKind,
    deps: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: TaskKind) -> Self {
        let name: String = name.into();
        Self {
            name: cli_name(&name),
            description: description.into(),
            kind,
            deps: Vec::new(),
        }
    }

    pub fn with_deps(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    image_build_tasks: Vec<String>,
    image_clean_tasks: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 標準のタスク一式を構築
    pub fn standard<'a>(
        images: impl IntoIterator<Item = &'a str>,
        resume_image: &str,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for image in images {
            registry.register_image(image)?;
        }

        registry.add(Task::new(
            "build_all_images",
            "Build all required Docker images",
            TaskKind::BuildAllImages,
        ))?;
        registry.add(Task::new(
            "clean_images",
            "Remove useless containers and images",
            TaskKind::CleanImages,
        ))?;
        registry.add(
            Task::new("resume", "Build resume as pdf file", TaskKind::Resume)
                .with_deps([cli_name(resume_image)]),
        )?;
        registry.add(Task::new(
            "cleanup",
            "Remove useless temporary files",
            TaskKind::Cleanup,
        ))?;
        registry.add(Task::new(
            "get_version",
            "Print project version",
            TaskKind::GetVersion,
        ))?;
        registry.add(Task::new("list", "List available tasks", TaskKind::List))?;

        Ok(registry)
    }

    /// イメージのビルドタスク `<image>` とクリーンタスク `clean-<image>` を登録
    pub fn register_image(&mut self, image: &str) -> Result<()> {
        let build_name = cli_name(image);
        let clean_name = format!("clean-{}", build_name);

        self.add(Task::new(
            build_name.clone(),
            format!("Build <{}> Docker image", image),
            TaskKind::BuildImage(image.to_string()),
        ))?;
        self.add(Task::new(
            clean_name.clone(),
            format!("Remove useless containers and images of <{}> Docker image", image),
            TaskKind::CleanImage(image.to_string()),
        ))?;

        self.image_build_tasks.push(build_name);
        self.image_clean_tasks.push(clean_name);
        Ok(())
    }

    pub fn add(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(CoreError::DuplicateTask(task.name));
        }
        tracing::debug!("Registered task: {}", task.name);
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&idx| &self.tasks[idx])
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn image_build_tasks(&self) -> &[String] {
        &self.image_build_tasks
    }

    pub fn image_clean_tasks(&self) -> &[String] {
        &self.image_clean_tasks
    }

    /// タスクの依存先
    pub fn deps_of<'a>(&'a self, task: &'a Task) -> &'a [String] {
        match task.kind {
            TaskKind::BuildAllImages => &self.image_build_tasks,
            TaskKind::CleanImages => &self.image_clean_tasks,
            _ => &task.deps,
        }
    }

    /// 指定タスクを依存順に並べる
    ///
    /// 依存先が先に来て、同じタスクは一度だけ含まれます。
    pub fn execution_plan<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Task>> {
        let mut plan = Vec::new();
        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut path = Vec::new();

        for name in names {
            self.visit(name.as_ref(), &mut state, &mut path, &mut plan)?;
        }

        Ok(plan)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        state: &mut HashMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
        plan: &mut Vec<&'a Task>,
    ) -> Result<()> {
        let task = self
            .get(name)
            .ok_or_else(|| CoreError::UnknownTask(name.to_string()))?;

        match state.get(task.name.as_str()) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let mut cycle: Vec<&str> = path.clone();
                cycle.push(&task.name);
                return Err(CoreError::CircularDependency(cycle.join(" -> ")));
            }
            None => {}
        }

        state.insert(&task.name, Visit::InProgress);
        path.push(&task.name);
        for dep in self.deps_of(task) {
            self.visit(dep, state, path, plan)?;
        }
        path.pop();
        state.insert(&task.name, Visit::Done);
        plan.push(task);

        Ok(())
    }
}
