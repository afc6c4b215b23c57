//! 共通の抽象化レイヤーとトレイト定義

pub mod context;
pub mod cookie;
pub mod http;
pub mod traits;
pub mod utils;

pub use context::RequestContext;
pub use cookie::{Cookie, SameSite};
pub use http::{Method, Request, Response, StatusCode};
pub use traits::{handler_fn, FnHandler, HandlerFuture, Middleware, RouteHandler, Router};
pub use utils::{get_max_body_size, parse_query_string, percent_decode};
