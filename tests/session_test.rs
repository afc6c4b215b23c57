//! セッション管理のインテグレーションテスト

use std::sync::Arc;

use routegate::{
    handler_fn, Gateway, Method, Payload, Request, Response, RouteHandler, SessionConfig,
};

const COOKIE_NAME: &str = "sid";
const COOKIE_KEY: &str = "user_id";

fn login_handler(max_age: i64) -> Arc<dyn RouteHandler> {
    handler_fn(move |rt, req, w| {
        Box::pin(async move {
            let config = SessionConfig::new(COOKIE_NAME, COOKIE_KEY)
                .with_max_age(max_age)
                .http_only(true);
            rt.start_session(w, &req, "u1", &config).await?;
            rt.respond_data(w, 200, "text/plain; charset=utf-8", Some(Payload::Text("ok".into())));
            Ok(())
        })
    })
}

fn whoami_handler() -> Arc<dyn RouteHandler> {
    handler_fn(|rt, req, w| {
        Box::pin(async move {
            match rt.check_session(&req, COOKIE_NAME, COOKIE_KEY).await {
                Ok(user_id) => {
                    rt.respond_data(
                        w,
                        200,
                        "text/plain; charset=utf-8",
                        Some(Payload::Text(user_id)),
                    );
                }
                Err(e) => {
                    let code = e.status_code();
                    rt.respond_error(w, code, e);
                }
            }
            Ok(())
        })
    })
}

fn logout_handler() -> Arc<dyn RouteHandler> {
    handler_fn(|rt, req, w| {
        Box::pin(async move {
            rt.close_session(w, &req, COOKIE_NAME, COOKIE_KEY).await;
            rt.respond_data(w, 204, "", None);
            Ok(())
        })
    })
}

fn build_app(login_max_age: i64) -> Gateway {
    Gateway::builder()
        .route("", "/login", &[Method::POST], login_handler(login_max_age))
        .unwrap()
        .route("", "/whoami", &[Method::GET], whoami_handler())
        .unwrap()
        .route("", "/logout", &[Method::POST], logout_handler())
        .unwrap()
        .build()
}

/// Set-Cookieヘッダーからクッキー値を取り出す（簡易クッキージャー）
fn cookie_value(res: &Response, name: &str) -> Option<String> {
    let header = res.headers.get("Set-Cookie")?;
    let first = header.split(';').next()?;
    let mut parts = first.splitn(2, '=');
    if parts.next()? == name {
        parts.next().map(|v| v.to_string())
    } else {
        None
    }
}

fn with_cookie(req: Request, name: &str, value: &str) -> Request {
    req.with_header("Cookie", format!("{}={}", name, value))
}

#[tokio::test]
async fn test_start_then_check_returns_user_id() {
    let app = build_app(3600);

    let login_res = app
        .handle(Request::new(Method::POST, "/login".to_string()))
        .await;
    assert_eq!(login_res.status, 200);

    let sid = cookie_value(&login_res, COOKIE_NAME).expect("no session cookie set");
    let set_cookie = login_res.headers.get("Set-Cookie").unwrap();
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=3600"));
    assert!(set_cookie.contains("HttpOnly"));

    let whoami_res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            &sid,
        ))
        .await;

    assert_eq!(whoami_res.status, 200);
    assert_eq!(whoami_res.body.unwrap(), b"u1".to_vec());
}

#[tokio::test]
async fn test_check_without_session_is_unauthorized() {
    let app = build_app(3600);

    // クッキーなし
    let res = app
        .handle(Request::new(Method::GET, "/whoami".to_string()))
        .await;
    assert_eq!(res.status, 401);

    // 未知のセッションID
    let res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            "bogus-session-id",
        ))
        .await;
    assert_eq!(res.status, 401);

    let body: serde_json::Value = serde_json::from_slice(&res.body.unwrap()).unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_start_close_check_is_unauthorized() {
    let app = build_app(3600);

    let login_res = app
        .handle(Request::new(Method::POST, "/login".to_string()))
        .await;
    let sid = cookie_value(&login_res, COOKIE_NAME).unwrap();

    let logout_res = app
        .handle(with_cookie(
            Request::new(Method::POST, "/logout".to_string()),
            COOKIE_NAME,
            &sid,
        ))
        .await;
    assert_eq!(logout_res.status, 204);
    // 失効クッキーが返される
    let expired_cookie = logout_res.headers.get("Set-Cookie").unwrap();
    assert!(expired_cookie.contains("Max-Age=0"));

    let whoami_res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            &sid,
        ))
        .await;
    assert_eq!(whoami_res.status, 401);
}

#[tokio::test]
async fn test_negative_max_age_session_is_expired() {
    // 負のmax-ageで開始されたセッションは内容に関わらず失効扱い
    let app = build_app(-1);

    let login_res = app
        .handle(Request::new(Method::POST, "/login".to_string()))
        .await;
    assert_eq!(login_res.status, 200);
    let sid = cookie_value(&login_res, COOKIE_NAME).unwrap();

    let whoami_res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            &sid,
        ))
        .await;
    assert_eq!(whoami_res.status, 401);
}

#[tokio::test]
async fn test_restart_invalidates_previous_session() {
    let app = build_app(3600);

    let first_login = app
        .handle(Request::new(Method::POST, "/login".to_string()))
        .await;
    let first_sid = cookie_value(&first_login, COOKIE_NAME).unwrap();

    // 同じクッキーを提示して再ログイン → 旧セッションは無効化される
    let second_login = app
        .handle(with_cookie(
            Request::new(Method::POST, "/login".to_string()),
            COOKIE_NAME,
            &first_sid,
        ))
        .await;
    let second_sid = cookie_value(&second_login, COOKIE_NAME).unwrap();
    assert_ne!(first_sid, second_sid);

    // 旧IDでは未認証
    let res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            &first_sid,
        ))
        .await;
    assert_eq!(res.status, 401);

    // 新IDでは認証済み
    let res = app
        .handle(with_cookie(
            Request::new(Method::GET, "/whoami".to_string()),
            COOKIE_NAME,
            &second_sid,
        ))
        .await;
    assert_eq!(res.status, 200);
}
