//! ディスパッチに組み込まれる横断的なふるまい
//!
//! 相関ID付与・アクセスログ・CORSの3つはユーザー定義の
//! Middlewareチェーンとは別に、Gatewayのディスパッチが直接適用する。

pub mod access_log;
pub mod cors;
pub mod request_id;

pub use access_log::Severity;
pub use cors::CorsPolicy;
pub use request_id::{request_id, REQUEST_ID_HEADER, REQUEST_ID_KEY};
