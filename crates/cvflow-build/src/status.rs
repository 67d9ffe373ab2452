//! ビルドステータスレコード
//!
//! Docker のビルドレスポンスは1行に1つのJSONオブジェクトを返します。
//! `stream` / `status` / `error` のいずれかのキーを持ち、この順で判定します。

use crate::error::{BuildError, BuildResult};
use serde_json::Value;

/// レイヤー単位のバイト進捗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusRecord {
    /// ビルドステップの出力 (改行を含んだまま)
    Stream(String),
    /// pull などのステータス
    Status {
        status: String,
        id: Option<String>,
        progress: Option<Progress>,
    },
    Error(String),
    /// 上記のいずれにも当てはまらないレコード
    Other(Value),
}

impl StatusRecord {
    /// 1行分のJSONをデコード
    pub fn decode_line(line: &str) -> BuildResult<Self> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| BuildError::InvalidRecord(format!("{}: {}", e, line.trim())))?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        if let Some(stream) = text("stream") {
            return StatusRecord::Stream(stream);
        }

        if let Some(status) = text("status") {
            let progress = value.get("progressDetail").and_then(|detail| {
                let current = detail.get("current").and_then(Value::as_u64)?;
                Some(Progress {
                    current,
                    total: detail.get("total").and_then(Value::as_u64),
                })
            });
            return StatusRecord::Status {
                status,
                id: text("id"),
                progress,
            };
        }

        let error = text("error").or_else(|| {
            value
                .get("errorDetail")
                .and_then(|detail| detail.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        if let Some(error) = error {
            return StatusRecord::Error(error);
        }

        StatusRecord::Other(value)
    }
}

impl From<bollard::models::BuildInfo> for StatusRecord {
    fn from(info: bollard::models::BuildInfo) -> Self {
        if let Some(stream) = info.stream {
            return StatusRecord::Stream(stream);
        }

        if let Some(status) = info.status {
            // 負の値はエンジンが進捗を持たないことを表す
            let progress = info.progress_detail.and_then(|detail| {
                let current = u64::try_from(detail.current?).ok()?;
                Some(Progress {
                    current,
                    total: detail.total.and_then(|total| u64::try_from(total).ok()),
                })
            });
            return StatusRecord::Status {
                status,
                id: info.id,
                progress,
            };
        }

        if let Some(error) = info
            .error
            .or_else(|| info.error_detail.and_then(|detail| detail.message))
        {
            return StatusRecord::Error(error);
        }

        // aux の型は buildkit フィーチャーで変わるため文字列フィールドのみ残す
        let mut fields = serde_json::Map::new();
        if let Some(id) = info.id {
            fields.insert("id".to_string(), Value::String(id));
        }
        if let Some(progress) = info.progress {
            fields.insert("progress".to_string(), Value::String(progress));
        }
        if fields.is_empty() {
            StatusRecord::Other(Value::Null)
        } else {
            StatusRecord::Other(Value::Object(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stream() {
        let record = StatusRecord::decode_line(r#"{"stream":"Step 1/4 : FROM debian\n"}"#).unwrap();
        assert_eq!(
            record,
            StatusRecord::Stream("Step 1/4 : FROM debian\n".to_string())
        );
    }

    #[test]
    fn test_decode_status_with_progress() {
        let line = r#"{"status":"Downloading","progressDetail":{"current":1024,"total":2048},"id":"a3ed95caeb02"}"#;
        let record = StatusRecord::decode_line(line).unwrap();
        assert_eq!(
            record,
            StatusRecord::Status {
                status: "Downloading".to_string(),
                id: Some("a3ed95caeb02".to_string()),
                progress: Some(Progress {
                    current: 1024,
                    total: Some(2048)
                }),
            }
        );
    }

    #[test]
    fn test_decode_status_with_empty_progress_detail() {
        let line = r#"{"status":"Pull complete","progressDetail":{},"id":"abc123"}"#;
        let record = StatusRecord::decode_line(line).unwrap();
        assert_eq!(
            record,
            StatusRecord::Status {
                status: "Pull complete".to_string(),
                id: Some("abc123".to_string()),
                progress: None,
            }
        );
    }

    #[test]
    fn test_decode_error() {
        let line = r#"{"errorDetail":{"message":"boom"},"error":"boom"}"#;
        let record = StatusRecord::decode_line(line).unwrap();
        assert!(matches!(record, StatusRecord::Error(_)));
        assert_eq!(record, StatusRecord::Error("boom".to_string()));
    }

    #[test]
    fn test_decode_error_detail_only() {
        let line = r#"{"errorDetail":{"code":1,"message":"failed to solve"}}"#;
        let record = StatusRecord::decode_line(line).unwrap();
        assert_eq!(record, StatusRecord::Error("failed to solve".to_string()));
    }

    #[test]
    fn test_stream_takes_priority() {
        let record = StatusRecord::decode_line(r#"{"stream":"x","error":"y"}"#).unwrap();
        assert_eq!(record, StatusRecord::Stream("x".to_string()));
    }

    #[test]
    fn test_decode_other() {
        let record = StatusRecord::decode_line(r#"{"aux":{"ID":"sha256:1234"}}"#).unwrap();
        assert!(matches!(record, StatusRecord::Other(_)));
    }

    #[test]
    fn test_decode_invalid_json() {
        let result = StatusRecord::decode_line("not json");
        assert!(matches!(result, Err(BuildError::InvalidRecord(_))));
    }

    #[test]
    fn test_from_build_info_error_detail() {
        let info = bollard::models::BuildInfo {
            error_detail: Some(bollard::models::ErrorDetail {
                message: Some("failed to solve".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            StatusRecord::from(info),
            StatusRecord::Error("failed to solve".to_string())
        );
    }

    #[test]
    fn test_from_build_info_stream() {
        let info = bollard::models::BuildInfo {
            stream: Some("Step 2/4 : RUN apt-get update\n".to_string()),
            status: Some("ignored".to_string()),
            ..Default::default()
        };
        assert_eq!(
            StatusRecord::from(info),
            StatusRecord::Stream("Step 2/4 : RUN apt-get update\n".to_string())
        );
    }

    #[test]
    fn test_from_build_info_status_with_progress() {
        let info = bollard::models::BuildInfo {
            status: Some("Downloading".to_string()),
            id: Some("a3ed95caeb02".to_string()),
            progress_detail: Some(bollard::models::ProgressDetail {
                current: Some(1024),
                total: Some(2048),
            }),
            ..Default::default()
        };
        assert_eq!(
            StatusRecord::from(info),
            StatusRecord::Status {
                status: "Downloading".to_string(),
                id: Some("a3ed95caeb02".to_string()),
                progress: Some(Progress {
                    current: 1024,
                    total: Some(2048)
                }),
            }
        );
    }

    #[test]
    fn test_from_build_info_status_without_total() {
        let info = bollard::models::BuildInfo {
            status: Some("Extracting".to_string()),
            progress_detail: Some(bollard::models::ProgressDetail {
                current: Some(512),
                total: Some(-1),
            }),
            ..Default::default()
        };
        assert_eq!(
            StatusRecord::from(info),
            StatusRecord::Status {
                status: "Extracting".to_string(),
                id: None,
                progress: Some(Progress {
                    current: 512,
                    total: None
                }),
            }
        );
    }

    #[test]
    fn test_from_build_info_error_takes_plain_message() {
        let info = bollard::models::BuildInfo {
            error: Some("boom".to_string()),
            error_detail: Some(bollard::models::ErrorDetail {
                message: Some("detail".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(StatusRecord::from(info), StatusRecord::Error("boom".to_string()));
    }

    #[test]
    fn test_from_build_info_other() {
        let empty = StatusRecord::from(bollard::models::BuildInfo::default());
        assert_eq!(empty, StatusRecord::Other(Value::Null));

        let info = bollard::models::BuildInfo {
            id: Some("moby.image.id".to_string()),
            ..Default::default()
        };
        assert_eq!(
            StatusRecord::from(info),
            StatusRecord::Other(serde_json::json!({"id": "moby.image.id"}))
        );
    }
}
