//! アクセスログ
//!
//! 完了したリクエストをステータスコードで重要度に分類し、
//! warning/errorに該当するものだけをログに出力する。
//! 正常なリクエストはこのレイヤーではログしない（ノイズ抑制の方針）。

use std::time::Duration;

use log::{error, warn};

use crate::common::http::StatusCode;
use crate::respond::ResponseCapture;

/// アクセスログの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// ステータスコードを重要度に分類する
pub fn classify(status: u16) -> Severity {
    if status >= 500 {
        Severity::Error
    } else if status >= 400 {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// この重要度をログに出力するか
pub fn should_log(severity: Severity) -> bool {
    matches!(severity, Severity::Warn | Severity::Error)
}

/// ログ1行分を整形する
///
/// 記録されたエラーは二重引用符を取り除き、なければ `-` を出す。
pub fn format_line(
    remote_addr: &str,
    status: u16,
    elapsed: Duration,
    error_text: Option<&str>,
) -> String {
    let error_text = match error_text {
        Some(text) => text.replace('"', ""),
        None => "-".to_string(),
    };
    format!(
        "addr: {}, completed with {} {} in {:?}, {}",
        remote_addr,
        status,
        StatusCode::reason_phrase_for(status),
        elapsed,
        error_text
    )
}

/// 完了したリクエストをログに出力する
pub(crate) fn emit(remote_addr: &str, capture: &ResponseCapture, elapsed: Duration) {
    let severity = classify(capture.status());
    if !should_log(severity) {
        return;
    }

    let error_text = capture.error().map(|e| e.to_string());
    let line = format_line(
        remote_addr,
        capture.status(),
        elapsed,
        error_text.as_deref(),
    );

    match severity {
        Severity::Error => error!("{}", line),
        Severity::Warn => warn!("{}", line),
        Severity::Info => {}
    }
}
