//! レスポンスボディの表現

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// レスポンスボディの直和型
///
/// 生バイト列・文字列・JSON値の3種のみを許容する。
/// 未対応の型はコンパイル時に排除される。
#[derive(Debug, Clone)]
pub enum Payload {
    /// 生バイト列（そのまま書き出される）
    Bytes(Vec<u8>),
    /// 文字列（そのまま書き出される）
    Text(String),
    /// JSON値（書き出し時にシリアライズされる）
    Json(Value),
}

impl Payload {
    /// シリアライズ可能な値からJSONペイロードを作成
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| Error::ResponseSerializationError(e.to_string()))
    }

    /// 書き出し用のバイト列へ変換する
    ///
    /// Bytes/Textはそのまま、JsonのみシリアライズされるためText/Bytesに
    /// 既成のJSONを渡した場合も二重エンコードされない。
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>, Error> {
        match self {
            Payload::Bytes(b) => Ok(b),
            Payload::Text(s) => Ok(s.into_bytes()),
            Payload::Json(v) => serde_json::to_vec(&v)
                .map_err(|e| Error::ResponseSerializationError(e.to_string())),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Content-TypeがJSON系かを判定
pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type.contains("application/json")
}
