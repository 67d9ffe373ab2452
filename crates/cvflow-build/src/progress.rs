//! ビルド進捗の表示
//!
//! ステータスレコードのストリームを読み、人が読める形式で出力します。

use crate::error::BuildResult;
use crate::status::{Progress, StatusRecord};
use futures_util::stream::{Stream, StreamExt};
use std::io::Write;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// バイト数を KB/MB/GB/TB 表記に変換
///
/// 1024 未満は整数のまま `Bytes` (0 と 1 も複数形) で表示します。
/// 各単位の範囲は `[unit, next_unit)` です。
pub fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    match bytes {
        b if b < KB => format!("{} Bytes", b),
        b if b < MB => format!("{:.2} KB", value / KB as f64),
        b if b < GB => format!("{:.2} MB", value / MB as f64),
        b if b < TB => format!("{:.2} GB", value / GB as f64),
        _ => format!("{:.2} TB", value / TB as f64),
    }
}

fn format_progress(progress: &Progress) -> String {
    match progress.total {
        Some(total) => format!(
            "{}/{}",
            format_bytes(progress.current),
            format_bytes(total)
        ),
        None => format_bytes(progress.current),
    }
}

/// `status` レコードを1行に整形
pub fn render_status(status: &str, id: Option<&str>, progress: Option<&Progress>) -> String {
    match (id, progress) {
        (Some(id), Some(progress)) => format!("{}: {} {}", id, status, format_progress(progress)),
        (Some(id), None) => format!("{}: {}", id, status),
        (None, _) => status.to_string(),
    }
}

/// ビルド出力を解析して表示
///
/// エラーレコードを受け取った時点で読み込みを止めて `false` を返します。
/// 最後までエラーが無ければ `true` です。
pub async fn interpret_build_output<S, W>(records: S, out: &mut W) -> BuildResult<bool>
where
    S: Stream<Item = BuildResult<StatusRecord>>,
    W: Write,
{
    futures_util::pin_mut!(records);

    while let Some(record) = records.next().await {
        match record? {
            StatusRecord::Stream(text) => {
                write!(out, "{}", text)?;
            }
            StatusRecord::Status {
                status,
                id,
                progress,
            } => {
                writeln!(
                    out,
                    "{}",
                    render_status(&status, id.as_deref(), progress.as_ref())
                )?;
            }
            StatusRecord::Error(message) => {
                writeln!(out, "{}", message)?;
                out.flush()?;
                tracing::debug!("Build status stream reported an error");
                return Ok(false);
            }
            StatusRecord::Other(value) => {
                if !value.is_null() {
                    writeln!(out, "{}", value)?;
                }
            }
        }
        out.flush()?;
    }

    Ok(true)
}
