//! CORSポリシー
//!
//! 許可オリジンは構成ルートでの明示的な選択とする。
//! デフォルトは無効（ヘッダーを一切付与しない）。

use crate::common::http::{Method, Request, Response};

const DEFAULT_ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS";

/// CORSポリシー設定
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl CorsPolicy {
    /// CORSを無効にする（デフォルト）
    pub fn disabled() -> Self {
        Self {
            allowed_origins: Vec::new(),
        }
    }

    /// すべてのオリジンを許可する
    pub fn allow_any() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }

    /// 指定したオリジンのみ許可する
    pub fn allow_origins(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: origins,
        }
    }

    /// ポリシーが有効かどうか
    pub fn is_enabled(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    /// このリクエストに返すAccess-Control-Allow-Originの値
    pub(crate) fn allow_origin_value(&self, req: &Request) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        let origin = req.header("origin")?;
        self.allowed_origins
            .iter()
            .find(|o| o.as_str() == origin)
            .cloned()
    }

    /// プリフライトリクエストかどうか
    pub(crate) fn is_preflight(req: &Request) -> bool {
        req.method == Method::OPTIONS && req.header("access-control-request-method").is_some()
    }

    /// プリフライトへの応答を生成する
    pub(crate) fn preflight_response(&self, req: &Request) -> Response {
        let mut res = Response::new(204);
        if let Some(origin) = self.allow_origin_value(req) {
            res.headers
                .insert("Access-Control-Allow-Origin".to_string(), origin);
            res.headers.insert(
                "Access-Control-Allow-Methods".to_string(),
                DEFAULT_ALLOWED_METHODS.to_string(),
            );
            if let Some(requested) = req.header("access-control-request-headers") {
                res.headers.insert(
                    "Access-Control-Allow-Headers".to_string(),
                    requested.to_string(),
                );
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_policy_adds_nothing() {
        let policy = CorsPolicy::disabled();
        let req = Request::new(Method::GET, "/".to_string())
            .with_header("Origin", "https://example.com");

        assert!(!policy.is_enabled());
        assert_eq!(policy.allow_origin_value(&req), None);
    }

    #[test]
    fn test_allow_any_returns_wildcard() {
        let policy = CorsPolicy::allow_any();
        let req = Request::new(Method::GET, "/".to_string());

        assert_eq!(policy.allow_origin_value(&req), Some("*".to_string()));
    }

    #[test]
    fn test_allow_origins_echoes_matching_origin() {
        let policy = CorsPolicy::allow_origins(vec!["https://example.com".to_string()]);

        let matching = Request::new(Method::GET, "/".to_string())
            .with_header("Origin", "https://example.com");
        assert_eq!(
            policy.allow_origin_value(&matching),
            Some("https://example.com".to_string())
        );

        let other = Request::new(Method::GET, "/".to_string())
            .with_header("Origin", "https://evil.example");
        assert_eq!(policy.allow_origin_value(&other), None);
    }

    #[test]
    fn test_preflight_detection() {
        let preflight = Request::new(Method::OPTIONS, "/api/items".to_string())
            .with_header("Access-Control-Request-Method", "POST");
        assert!(CorsPolicy::is_preflight(&preflight));

        // 通常のOPTIONSはプリフライトではない
        let plain_options = Request::new(Method::OPTIONS, "/api/items".to_string());
        assert!(!CorsPolicy::is_preflight(&plain_options));
    }

    #[test]
    fn test_preflight_response_headers() {
        let policy = CorsPolicy::allow_any();
        let req = Request::new(Method::OPTIONS, "/api/items".to_string())
            .with_header("Access-Control-Request-Method", "POST")
            .with_header("Access-Control-Request-Headers", "content-type");

        let res = policy.preflight_response(&req);
        assert_eq!(res.status, 204);
        assert_eq!(
            res.headers.get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );
        assert_eq!(
            res.headers.get("Access-Control-Allow-Headers"),
            Some(&"content-type".to_string())
        );
    }
}
