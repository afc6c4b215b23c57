//! ルート登録とパスパターン

pub mod pattern;
pub mod registry;

pub use pattern::PathPattern;
pub use registry::{Registry, Route, RouteGroup};
