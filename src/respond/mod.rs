//! レスポンス書き出し（Responder）
//!
//! すべての書き出しはResponseCaptureを経由し、最終ステータスとエラーが
//! アクセスログから観測できるようにする。

pub mod capture;
pub mod compress;
pub mod payload;

pub use capture::ResponseCapture;
pub use compress::Compression;
pub use payload::Payload;

use log::error as log_error;

use crate::common::http::Request;
use crate::error::Error;
use payload::is_json_content_type;

/// 非圧縮レスポンスの書き出し
///
/// - ペイロードなし: ステータスのみ書き出す
/// - Content-TypeがJSON系: Json値はシリアライズ、Text/Bytesはそのまま書き出す
///   （シリアライズ失敗時はエラー形のボディを500で返す）
/// - それ以外のContent-Type: Text/Bytesをそのまま書き出す。Json値は
///   Content-Typeと整合しないため500で拒否する
pub fn data(w: &mut ResponseCapture, code: u16, content_type: &str, payload: Option<Payload>) {
    let payload = match payload {
        None => {
            w.write(code, None);
            return;
        }
        Some(p) => p,
    };

    if is_json_content_type(content_type) {
        if !content_type.is_empty() {
            w.set_header("Content-Type", content_type);
        }
        match payload.into_bytes() {
            Ok(bytes) => w.write(code, Some(bytes)),
            Err(e) => {
                log_error!("respond::data serialization failed: {}", e);
                let fallback = format!(r#"{{"error": "{}"}}"#, e);
                w.write(500, Some(fallback.into_bytes()));
            }
        }
    } else {
        match payload {
            Payload::Text(s) => {
                if !content_type.is_empty() {
                    w.set_header("Content-Type", content_type);
                }
                w.write(code, Some(s.into_bytes()));
            }
            Payload::Bytes(b) => {
                if !content_type.is_empty() {
                    w.set_header("Content-Type", content_type);
                }
                w.write(code, Some(b));
            }
            Payload::Json(_) => {
                // JSON値は非JSONのContent-Typeでは書き出せない
                w.set_header("Content-Type", "text/html; charset=utf-8");
                w.write(500, Some(b"unsupported payload type".to_vec()));
            }
        }
    }
}

/// 圧縮レスポンスの書き出し
///
/// クライアントのAccept-Encodingに要求方式のトークンが含まれる場合のみ
/// 圧縮し、Content-Encodingヘッダーを付与する。含まれない場合は非圧縮の
/// まま書き出す。シリアライズまたは圧縮の失敗は500のエラーレスポンスになる。
pub fn compressed(
    w: &mut ResponseCapture,
    req: &Request,
    code: u16,
    compression: Compression,
    content_type: &str,
    payload: Option<Payload>,
) {
    let payload = match payload {
        None => {
            data(w, code, content_type, None);
            return;
        }
        Some(p) => p,
    };

    let chosen = compress::negotiate(req, compression);
    if chosen == Compression::None {
        data(w, code, content_type, Some(payload));
        return;
    }

    let source = match payload.into_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error(w, 500, e);
            return;
        }
    };

    match compress::compress(chosen, &source) {
        Ok(compressed_bytes) => {
            w.set_header("Content-Encoding", chosen.token());
            if !content_type.is_empty() {
                w.set_header("Content-Type", content_type);
            }
            w.write(code, Some(compressed_bytes));
        }
        Err(e) => error(w, 500, e),
    }
}

/// エラーレスポンスの書き出し
///
/// エラーをJSONエンベロープに包んで書き出し、キャプチャにも記録して
/// アクセスログから参照できるようにする。
pub fn error(w: &mut ResponseCapture, code: u16, err: Error) {
    let envelope = err.envelope();
    w.record_error(err);
    data(
        w,
        code,
        "application/json; charset=utf-8",
        Some(Payload::Json(envelope)),
    );
}
