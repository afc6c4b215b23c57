//! エラー型の定義

use serde_json::{json, Map, Value};
use thiserror::Error;

/// アプリケーションのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// リクエストのルーティングエラー
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// パスは一致したがメソッドが許可されていない
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// 無効なルートパターン
    #[error("Invalid route pattern: {0}")]
    InvalidRoutePattern(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// 無効なヘッダー値
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// 無効なクッキー名/値
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    /// レスポンスのシリアライズエラー
    #[error("Failed to serialize response: {0}")]
    ResponseSerializationError(String),

    /// レスポンスの圧縮エラー
    #[error("Failed to compress response: {0}")]
    CompressionError(String),

    /// ミドルウェアエラー
    #[error("Middleware error: {0}")]
    MiddlewareError(String),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// セッションストアのエラー
    #[error("Session store error: {0}")]
    SessionStoreError(String),

    /// 未認証（セッションなし、または失効済み）
    #[error("unauthorized")]
    Unauthorized,

    /// 構造化エラー（エラーコード・トレース付き）
    /// エラーレスポンスのJSONエンベロープにcode/trace/detailとして展開される
    #[error("{detail}")]
    Tagged {
        code: i64,
        detail: String,
        trace: Vec<String>,
    },
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::InvalidRoutePattern(_) => 500,
            Error::InvalidRequestBody(_) => 400,
            Error::InvalidHeader(_) => 400,
            Error::InvalidCookie(_) => 400,
            Error::ResponseSerializationError(_) => 500,
            Error::CompressionError(_) => 500,
            Error::MiddlewareError(_) => 500,
            Error::InternalServerError(_) => 500,
            Error::SessionStoreError(_) => 500,
            Error::Unauthorized => 401,
            Error::Tagged { .. } => 500,
        }
    }

    /// エラーレスポンス用のJSONエンベロープを生成
    ///
    /// Taggedの場合は `{"error": {"code": .., "trace": [..], "detail": ".."}}`
    /// （codeが0、traceが空なら省略）、それ以外は `{"error": "<message>"}`
    pub fn envelope(&self) -> Value {
        match self {
            Error::Tagged { code, detail, trace } => {
                let mut inner = Map::new();
                if *code != 0 {
                    inner.insert("code".to_string(), json!(code));
                }
                if !trace.is_empty() {
                    inner.insert("trace".to_string(), json!(trace));
                }
                inner.insert("detail".to_string(), json!(detail));
                json!({ "error": Value::Object(inner) })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}
