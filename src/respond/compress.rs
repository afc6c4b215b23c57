//! レスポンス圧縮（gzip / deflate）

use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};

use crate::common::http::Request;
use crate::error::Error;

/// 圧縮方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// 圧縮なし
    None,
    Gzip,
    /// HTTPのdeflateはzlib形式を指す
    Deflate,
}

impl Compression {
    /// Content-Encoding / Accept-Encodingのトークン
    pub fn token(&self) -> &'static str {
        match self {
            Compression::None => "identity",
            Compression::Gzip => "gzip",
            Compression::Deflate => "deflate",
        }
    }
}

/// Accept-Encodingヘッダーをトークン列にパースする
///
/// カンマ区切りの各エントリをトリムし、`;q=` 以降の品質値は落とす。
fn accepted_tokens(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(|entry| {
            entry
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// クライアントが要求方式を受け入れる場合のみその方式を返す
///
/// トークンがない、または要求方式と一致しない場合はCompression::None。
pub(crate) fn negotiate(req: &Request, requested: Compression) -> Compression {
    if requested == Compression::None {
        return Compression::None;
    }

    let accepted = req
        .header("accept-encoding")
        .map(accepted_tokens)
        .unwrap_or_default();

    if accepted.iter().any(|t| t == requested.token()) {
        requested
    } else {
        Compression::None
    }
}

/// データを指定方式で圧縮する
pub(crate) fn compress(kind: Compression, data: &[u8]) -> Result<Vec<u8>, Error> {
    match kind {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .and_then(|_| encoder.finish())
                .map_err(|e| Error::CompressionError(e.to_string()))
        }
        Compression::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .and_then(|_| encoder.finish())
                .map_err(|e| Error::CompressionError(e.to_string()))
        }
    }
}
