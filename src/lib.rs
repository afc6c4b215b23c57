//! routegate: リクエストハンドラと下層のルーティング機構の間に置く薄いファサード
//!
//! ハンドラコードが特定のルーティングライブラリに直接依存しないよう、
//! 安定したRouter能力インターフェースを境界として提供する。その上で
//! 3つの横断的なふるまいを加える:
//!
//! - リクエスト毎の相関ID（X-Request-IDヘッダーとコンテキストへの束縛）
//! - 完了リクエストのアクセスログ（warning/errorのみ出力）
//! - クッキーベースのセッション追跡（SessionStoreへ委譲）
//!
//! ルート表はGatewayBuilderで構成し、build()でトラフィック開始前に確定させる。

pub mod common;
pub mod error;
pub mod middleware;
pub mod respond;
pub mod route;
pub mod session;

pub use common::*;
pub use error::Error;
pub use middleware::{CorsPolicy, REQUEST_ID_HEADER};
pub use respond::{Compression, Payload, ResponseCapture};
pub use route::Registry;
pub use session::{MemoryStore, SessionConfig, SessionManager, SessionStore};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::{error, warn};

use route::registry::RouteMatch;

/// リクエストを処理するファサードを構築するためのビルダー
///
/// 登録はすべてビルダー上で行い、build()後のルート表は不変となる。
pub struct GatewayBuilder {
    registry: Registry,
    store: Option<Arc<dyn SessionStore>>,
    cors: CorsPolicy,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self {
            registry: Registry::new(),
            store: None,
            cors: CorsPolicy::disabled(),
        }
    }
}

impl GatewayBuilder {
    /// 新しいGatewayBuilderインスタンスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ルートを登録する
    ///
    /// subrouteが空文字列ならルート直下、そうでなければサブパスグループに
    /// 登録される。同じプレフィックスのグループは再利用される。
    pub fn route(
        mut self,
        subroute: &str,
        template: &str,
        methods: &[Method],
        handler: Arc<dyn RouteHandler>,
    ) -> Result<Self, Error> {
        self.registry.add_route(subroute, template, methods, handler)?;
        Ok(self)
    }

    /// ミドルウェアを登録する
    ///
    /// subrouteが空文字列ならすべてのルート、そうでなければそのグループの
    /// ルートにのみ、登録順で適用される。
    pub fn middleware<M>(mut self, subroute: &str, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.registry.add_middleware(subroute, Arc::new(middleware));
        self
    }

    /// セッションストアを設定する（未設定ならMemoryStore）
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// CORSポリシーを設定する（デフォルトは無効）
    pub fn cors(mut self, policy: CorsPolicy) -> Self {
        self.cors = policy;
        self
    }

    /// ファサードをビルドして返却
    pub fn build(self) -> Gateway {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>);
        Gateway {
            registry: self.registry,
            sessions: SessionManager::new(store),
            cors: self.cors,
        }
    }
}

/// ルート検索結果のディスパッチ用表現（借用を持たない）
enum Dispatch {
    NotFound,
    MethodNotAllowed,
    Found {
        handler: Arc<dyn RouteHandler>,
        middlewares: Vec<Arc<dyn Middleware>>,
        params: HashMap<String, String>,
    },
}

/// リクエストを処理するファサード
///
/// ルート表はビルド後に不変。セッションストアの並行安全性はストア実装に
/// 委譲される。
pub struct Gateway {
    registry: Registry,
    sessions: SessionManager,
    cors: CorsPolicy,
}

impl Gateway {
    /// 新しいGatewayBuilderインスタンスを作成
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// 1リクエストを処理する
    ///
    /// 相関ID付与 → CORS → ルート検索 → ミドルウェア前処理 → ハンドラ →
    /// アクセスログ → ミドルウェア後処理、の順に適用する。
    pub async fn handle(&self, req: Request) -> Response {
        let start = Instant::now();
        let mut req = req;
        let request_id = middleware::request_id::assign(&mut req);
        let remote_addr = req
            .remote_addr
            .clone()
            .unwrap_or_else(|| "-".to_string());
        let allow_origin = self.cors.allow_origin_value(&req);

        // プリフライトはハンドラに渡さず即応答する
        if self.cors.is_enabled() && CorsPolicy::is_preflight(&req) {
            let mut res = self.cors.preflight_response(&req);
            res.headers
                .insert(REQUEST_ID_HEADER.to_string(), request_id);
            return res;
        }

        let mut w = ResponseCapture::new();
        let mut middlewares: Vec<Arc<dyn Middleware>> = Vec::new();

        let body_len = req.body.as_ref().map(|b| b.len()).unwrap_or(0);
        if body_len > get_max_body_size() {
            warn!(
                "Request body too large: {} bytes (limit {})",
                body_len,
                get_max_body_size()
            );
            respond::error(
                &mut w,
                413,
                Error::InvalidRequestBody("request body too large".to_string()),
            );
        } else if let Err(e) = req.decompress_gzip_body() {
            respond::error(&mut w, 400, e);
        } else {
            match self.lookup(&req) {
                Dispatch::NotFound => {
                    error!("Route not found: {} {}", req.method, req.path);
                    respond::error(&mut w, 404, Error::RouteNotFound(req.path.clone()));
                }
                Dispatch::MethodNotAllowed => {
                    respond::error(
                        &mut w,
                        405,
                        Error::MethodNotAllowed(format!("{} {}", req.method, req.path)),
                    );
                }
                Dispatch::Found {
                    handler,
                    middlewares: chain,
                    params,
                } => {
                    middlewares = chain;
                    req.path_params = params;

                    match run_pre(&middlewares, req).await {
                        Err(e) => {
                            error!("Middleware error: {}", e);
                            let code = e.status_code();
                            respond::error(&mut w, code, e);
                        }
                        Ok(request) => {
                            if let Err(e) = handler.handle(self, request, &mut w).await {
                                error!("Handler error: {}", e);
                                let code = e.status_code();
                                respond::error(&mut w, code, e);
                            }
                        }
                    }
                }
            }
        }

        // ハンドラ完了時点の結果を記録する
        middleware::access_log::emit(&remote_addr, &w, start.elapsed());

        let mut response = w.into_response();

        for mw in &middlewares {
            match mw.post_process(response).await {
                Ok(processed) => response = processed,
                Err(e) => {
                    error!("Middleware error in post-processing: {}", e);
                    response = error_response(e);
                }
            }
        }

        response
            .headers
            .insert(REQUEST_ID_HEADER.to_string(), request_id);
        if let Some(origin) = allow_origin {
            response
                .headers
                .insert("Access-Control-Allow-Origin".to_string(), origin);
        }
        response
    }

    /// ルート検索結果を所有値に変換する
    fn lookup(&self, req: &Request) -> Dispatch {
        match self.registry.find(&req.path, req.method) {
            RouteMatch::NotFound => Dispatch::NotFound,
            RouteMatch::MethodNotAllowed => Dispatch::MethodNotAllowed,
            RouteMatch::Found {
                route,
                group,
                params,
            } => {
                let mut middlewares = self.registry.global_middlewares().to_vec();
                if !group.prefix.is_empty() {
                    middlewares.extend(group.middlewares.iter().cloned());
                }
                Dispatch::Found {
                    handler: Arc::clone(&route.handler),
                    middlewares,
                    params,
                }
            }
        }
    }
}

#[async_trait]
impl Router for Gateway {
    async fn start_session(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        user_id: &str,
        config: &SessionConfig,
    ) -> Result<(), Error> {
        self.sessions.start(w, req, user_id, config).await
    }

    async fn check_session(
        &self,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    ) -> Result<String, Error> {
        self.sessions.check(req, cookie_name, cookie_key).await
    }

    async fn close_session(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    ) {
        self.sessions.close(w, req, cookie_name, cookie_key).await
    }
}

/// ミドルウェアの前処理を登録順に適用する
async fn run_pre(
    middlewares: &[Arc<dyn Middleware>],
    mut req: Request,
) -> Result<Request, Error> {
    for mw in middlewares {
        req = mw.pre_process(req).await?;
    }
    Ok(req)
}

/// エラーから単独のレスポンスを組み立てる（後処理ミドルウェアの失敗時用）
fn error_response(err: Error) -> Response {
    let code = err.status_code();
    let mut w = ResponseCapture::new();
    respond::error(&mut w, code, err);
    w.into_response()
}
