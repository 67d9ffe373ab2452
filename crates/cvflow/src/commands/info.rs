use colored::Colorize;
use cvflow_core::TaskRegistry;
use std::io::Write;

/// タスク名と説明を登録順に表示
pub fn print_tasks<W: Write>(registry: &TaskRegistry, out: &mut W) -> std::io::Result<()> {
    let width = registry
        .tasks()
        .iter()
        .map(|task| task.name.len())
        .max()
        .unwrap_or(0);

    for task in registry.tasks() {
        writeln!(
            out,
            "{}  {}",
            format!("{:<width$}", task.name).cyan(),
            task.description
        )?;
    }
    Ok(())
}
