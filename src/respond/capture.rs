//! レスポンスキャプチャ（書き出し結果の記録）

use std::collections::HashMap;

use log::warn;

use crate::common::http::Response;
use crate::common::utils::is_header_value_valid;
use crate::error::Error;

/// レスポンス書き出しの中継点
///
/// ステータスコードと、書き出し中に記録されたエラーを保持し、
/// リクエスト完了後にアクセスログが参照できるようにする。
/// ステータスは最初の書き込みが優先される（トランスポートの契約に準拠）。
#[derive(Debug)]
pub struct ResponseCapture {
    status: u16,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    error: Option<Error>,
    written: bool,
}

impl Default for ResponseCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCapture {
    /// 新しいキャプチャを作成（ステータスは200で初期化）
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
            error: None,
            written: false,
        }
    }

    /// ヘッダーを設定（CRLF・制御文字を含む値はスキップ）
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if !is_header_value_valid(&value) {
            warn!("ResponseCapture skipped invalid header value for {}", name);
            return;
        }
        self.headers.insert(name, value);
    }

    /// ステータスコードを記録する
    ///
    /// ステータス0は呼び出し側の契約違反としてパニックする。
    /// 既に書き込み済みの場合は無視される（最初の書き込みが優先）。
    pub fn write_header(&mut self, status: u16) {
        if status == 0 {
            panic!("invalid status code");
        }
        if self.written {
            warn!(
                "ResponseCapture::write_header called twice, keeping status {}",
                self.status
            );
            return;
        }
        self.status = status;
        self.written = true;
    }

    /// ステータスとボディをまとめて書き出す
    pub fn write(&mut self, status: u16, body: Option<Vec<u8>>) {
        if status == 0 {
            panic!("invalid status code");
        }
        if self.written {
            warn!(
                "ResponseCapture::write called twice, keeping status {}",
                self.status
            );
            return;
        }
        self.status = status;
        self.written = true;
        self.body = body;
    }

    /// エラーを記録する（アクセスログとエラーレスポンス用）
    pub fn record_error(&mut self, err: Error) {
        self.error = Some(err);
    }

    /// 記録済みのステータスコード
    pub fn status(&self) -> u16 {
        self.status
    }

    /// 記録済みのエラー
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// ステータスが書き込み済みかどうか
    pub fn written(&self) -> bool {
        self.written
    }

    /// 最終的なレスポンスに変換する
    pub fn into_response(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults_to_200() {
        let capture = ResponseCapture::new();
        assert_eq!(capture.status(), 200);
        assert!(!capture.written());
        assert!(capture.error().is_none());
    }

    #[test]
    fn test_first_write_wins() {
        let mut capture = ResponseCapture::new();
        capture.write(201, Some(b"first".to_vec()));
        capture.write(500, Some(b"second".to_vec()));

        let res = capture.into_response();
        assert_eq!(res.status, 201);
        assert_eq!(res.body.unwrap(), b"first".to_vec());
    }

    #[test]
    #[should_panic(expected = "invalid status code")]
    fn test_zero_status_panics() {
        let mut capture = ResponseCapture::new();
        capture.write_header(0);
    }

    #[test]
    #[should_panic(expected = "invalid status code")]
    fn test_zero_status_panics_on_write() {
        let mut capture = ResponseCapture::new();
        capture.write(0, None);
    }

    #[test]
    fn test_invalid_header_value_skipped() {
        let mut capture = ResponseCapture::new();
        capture.set_header("X-Ok", "fine");
        capture.set_header("X-Bad", "evil\r\ninjected");

        let res = capture.into_response();
        assert_eq!(res.headers.get("X-Ok"), Some(&"fine".to_string()));
        assert!(res.headers.get("X-Bad").is_none());
    }

    #[test]
    fn test_record_error_is_readable() {
        let mut capture = ResponseCapture::new();
        capture.record_error(Error::InternalServerError("boom".into()));
        assert!(capture.error().is_some());
    }
}
