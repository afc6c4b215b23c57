//! ディスパッチのインテグレーションテスト

use std::sync::Arc;

use async_trait::async_trait;
use routegate::{
    handler_fn, CorsPolicy, Error, Gateway, Method, Middleware, Payload, Request, Response,
    RouteHandler, REQUEST_ID_HEADER,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// リクエスト/レスポンスに自分の名前を刻むテスト用ミドルウェア
struct TagMiddleware {
    name: &'static str,
}

#[async_trait]
impl Middleware for TagMiddleware {
    async fn pre_process(&self, mut req: Request) -> Result<Request, Error> {
        let tags = match req.header("x-tags") {
            Some(existing) => format!("{},{}", existing, self.name),
            None => self.name.to_string(),
        };
        req.headers.insert("x-tags".to_string(), tags);
        Ok(req)
    }

    async fn post_process(&self, mut res: Response) -> Result<Response, Error> {
        res.headers
            .insert(format!("X-Post-{}", self.name), "1".to_string());
        Ok(res)
    }
}

// リクエストの前処理で積まれたタグをそのまま返すハンドラ
fn echo_tags_handler() -> Arc<dyn RouteHandler> {
    handler_fn(|rt, req, w| {
        Box::pin(async move {
            let tags = req.header("x-tags").unwrap_or("").to_string();
            rt.respond_data(
                w,
                200,
                "text/plain; charset=utf-8",
                Some(Payload::Text(tags)),
            );
            Ok(())
        })
    })
}

#[tokio::test]
async fn test_request_id_header_on_every_response() {
    init_logger();
    let app = Gateway::builder()
        .route("", "/ping", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let first = app.handle(Request::new(Method::GET, "/ping".to_string())).await;
    let second = app.handle(Request::new(Method::GET, "/ping".to_string())).await;

    let id1 = first.headers.get(REQUEST_ID_HEADER).expect("missing request id");
    let id2 = second.headers.get(REQUEST_ID_HEADER).expect("missing request id");
    assert!(!id1.is_empty());
    // リクエスト毎に一意
    assert_ne!(id1, id2);

    // 404にも付与される
    let missing = app.handle(Request::new(Method::GET, "/nope".to_string())).await;
    assert!(missing.headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_unknown_route_yields_404_envelope() {
    init_logger();
    let app = Gateway::builder()
        .route("", "/ping", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::GET, "/missing".to_string())).await;
    assert_eq!(res.status, 404);

    let body: serde_json::Value = serde_json::from_slice(&res.body.unwrap()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("/missing"));
}

#[tokio::test]
async fn test_known_path_wrong_method_yields_405() {
    init_logger();
    let app = Gateway::builder()
        .route("", "/ping", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::DELETE, "/ping".to_string())).await;
    assert_eq!(res.status, 405);
}

#[tokio::test]
async fn test_path_params_extracted() {
    init_logger();
    let handler = handler_fn(|rt, req, w| {
        Box::pin(async move {
            let id = req.param("id").unwrap_or("none").to_string();
            rt.respond_data(w, 200, "text/plain; charset=utf-8", Some(Payload::Text(id)));
            Ok(())
        })
    });
    let app = Gateway::builder()
        .route("", "/items/{id:[0-9]+}", &[Method::GET], handler)
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::GET, "/items/42".to_string())).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body.unwrap(), b"42".to_vec());

    // 制約に反するセグメントは404
    let res = app.handle(Request::new(Method::GET, "/items/abc".to_string())).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_group_middleware_applies_to_all_group_routes_in_order() {
    init_logger();
    let app = Gateway::builder()
        .middleware("/api", TagMiddleware { name: "first" })
        .route("/api", "/a", &[Method::GET], echo_tags_handler())
        .unwrap()
        .middleware("/api", TagMiddleware { name: "second" })
        // ミドルウェア登録後に追加されたルートにも適用される
        .route("/api", "/b", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res_a = app.handle(Request::new(Method::GET, "/api/a".to_string())).await;
    assert_eq!(res_a.body.unwrap(), b"first,second".to_vec());

    let res_b = app.handle(Request::new(Method::GET, "/api/b".to_string())).await;
    assert_eq!(res_b.body.unwrap(), b"first,second".to_vec());

    // 後処理も両方適用される
    let res = app.handle(Request::new(Method::GET, "/api/a".to_string())).await;
    assert!(res.headers.contains_key("X-Post-first"));
    assert!(res.headers.contains_key("X-Post-second"));
}

#[tokio::test]
async fn test_global_middleware_runs_before_group_middleware() {
    init_logger();
    let app = Gateway::builder()
        .middleware("/api", TagMiddleware { name: "group" })
        .middleware("", TagMiddleware { name: "global" })
        .route("/api", "/a", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::GET, "/api/a".to_string())).await;
    assert_eq!(res.body.unwrap(), b"global,group".to_vec());
}

#[tokio::test]
async fn test_middleware_pre_failure_short_circuits() {
    init_logger();

    struct RejectMiddleware;

    #[async_trait]
    impl Middleware for RejectMiddleware {
        async fn pre_process(&self, _req: Request) -> Result<Request, Error> {
            Err(Error::Unauthorized)
        }

        async fn post_process(&self, res: Response) -> Result<Response, Error> {
            Ok(res)
        }
    }

    let app = Gateway::builder()
        .middleware("", RejectMiddleware)
        .route("", "/secret", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::GET, "/secret".to_string())).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_handler_error_becomes_error_response() {
    init_logger();
    let handler = handler_fn(|_rt, _req, _w| {
        Box::pin(async move { Err(Error::InternalServerError("db down".to_string())) })
    });
    let app = Gateway::builder()
        .route("", "/broken", &[Method::GET], handler)
        .unwrap()
        .build();

    let res = app
        .handle(
            Request::new(Method::GET, "/broken".to_string()).with_remote_addr("10.0.0.9:1234"),
        )
        .await;
    assert_eq!(res.status, 500);

    let body: serde_json::Value = serde_json::from_slice(&res.body.unwrap()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("db down"));
}

#[tokio::test]
async fn test_cors_preflight_short_circuit() {
    init_logger();
    let app = Gateway::builder()
        .cors(CorsPolicy::allow_any())
        .route("/api", "/items", &[Method::POST], echo_tags_handler())
        .unwrap()
        .build();

    let preflight = Request::new(Method::OPTIONS, "/api/items".to_string())
        .with_header("Origin", "https://example.com")
        .with_header("Access-Control-Request-Method", "POST");
    let res = app.handle(preflight).await;

    assert_eq!(res.status, 204);
    assert_eq!(
        res.headers.get("Access-Control-Allow-Origin"),
        Some(&"*".to_string())
    );
    assert!(res.headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_cors_header_on_normal_response() {
    init_logger();
    let app = Gateway::builder()
        .cors(CorsPolicy::allow_any())
        .route("", "/ping", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();

    let res = app.handle(Request::new(Method::GET, "/ping".to_string())).await;
    assert_eq!(
        res.headers.get("Access-Control-Allow-Origin"),
        Some(&"*".to_string())
    );

    // 無効ポリシー（デフォルト）ではヘッダーなし
    let app = Gateway::builder()
        .route("", "/ping", &[Method::GET], echo_tags_handler())
        .unwrap()
        .build();
    let res = app.handle(Request::new(Method::GET, "/ping".to_string())).await;
    assert!(!res.headers.contains_key("Access-Control-Allow-Origin"));
}

#[tokio::test]
async fn test_gzip_request_body_is_decompressed() {
    use std::io::Write;

    init_logger();
    let handler = handler_fn(|rt, req, w| {
        Box::pin(async move {
            let value: serde_json::Value = req.json()?;
            rt.respond_data(
                w,
                200,
                "application/json; charset=utf-8",
                Some(Payload::Json(value)),
            );
            Ok(())
        })
    });
    let app = Gateway::builder()
        .route("", "/echo", &[Method::POST], handler)
        .unwrap()
        .build();

    let original = br#"{"message":"compressed request"}"#;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(original).unwrap();
    let compressed = encoder.finish().unwrap();

    let req = Request::new(Method::POST, "/echo".to_string())
        .with_header("Content-Type", "application/json")
        .with_header("Content-Encoding", "gzip")
        .with_body(compressed);
    let res = app.handle(req).await;

    assert_eq!(res.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&res.body.unwrap()).unwrap();
    assert_eq!(body["message"], "compressed request");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    init_logger();
    let app = Gateway::builder()
        .route("", "/upload", &[Method::POST], echo_tags_handler())
        .unwrap()
        .build();

    // デフォルト上限5MBを超えるボディ
    let req = Request::new(Method::POST, "/upload".to_string())
        .with_body(vec![0u8; 5 * 1024 * 1024 + 1]);
    let res = app.handle(req).await;

    assert_eq!(res.status, 413);
}
