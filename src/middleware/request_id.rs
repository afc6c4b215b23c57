//! リクエスト相関ID

use uuid::Uuid;

use crate::common::http::Request;

/// 相関IDを返すレスポンスヘッダー名
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// リクエストコンテキスト内で相関IDを保持するキー
pub const REQUEST_ID_KEY: &str = "routegate-request-id";

/// リクエストに相関IDを付与する
///
/// リクエスト毎に一度だけ、他のミドルウェアより先に呼ばれる。
/// 生成したIDはコンテキストに束縛され、以降は読み取り専用。
pub fn assign(req: &mut Request) -> String {
    let id = Uuid::new_v4().to_string();
    req.context_mut().set(REQUEST_ID_KEY, id.clone());
    id
}

/// コンテキストから相関IDを取り出す
pub fn request_id(req: &Request) -> Option<&String> {
    req.context().get::<String>(REQUEST_ID_KEY)
}
