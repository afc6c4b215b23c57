//! コアトレイト定義（Router、Middleware、RouteHandler）

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Error;
use crate::respond::{self, Compression, Payload, ResponseCapture};
use crate::session::SessionConfig;
use super::http::{Request, Response};

/// ルーターの能力インターフェース
///
/// リクエストハンドラが特定のルーティング実装に依存しないための安定境界。
/// レスポンス書き出しはデフォルト実装で提供され、セッション操作のみ
/// 実装側（Gateway）に委譲される。
#[async_trait]
pub trait Router: Send + Sync {
    /// 非圧縮レスポンスの書き出し
    fn respond_data(
        &self,
        w: &mut ResponseCapture,
        code: u16,
        content_type: &str,
        data: Option<Payload>,
    ) {
        respond::data(w, code, content_type, data);
    }

    /// 圧縮レスポンスの書き出し
    ///
    /// クライアントのAccept-Encodingが要求された方式を含まない場合は
    /// 非圧縮のまま書き出される。
    fn respond_compressed(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        code: u16,
        compression: Compression,
        content_type: &str,
        data: Option<Payload>,
    ) {
        respond::compressed(w, req, code, compression, content_type, data);
    }

    /// エラーレスポンスの書き出し
    fn respond_error(&self, w: &mut ResponseCapture, code: u16, err: Error) {
        respond::error(w, code, err);
    }

    /// ログイン後の新規セッションを開始する。レスポンスにクッキーが付与される
    async fn start_session(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        user_id: &str,
        config: &SessionConfig,
    ) -> Result<(), Error>;

    /// ログイン済みかを検証し、ユーザーIDを返す
    async fn check_session(
        &self,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    ) -> Result<String, Error>;

    /// セッションを閉じる。永続化の失敗はログに残すのみで呼び出し元には返さない
    async fn close_session(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    );
}

/// ミドルウェアの特性
#[async_trait]
pub trait Middleware: Send + Sync {
    /// リクエスト前の処理
    async fn pre_process(&self, req: Request) -> Result<Request, Error>;

    /// レスポンス後の処理
    async fn post_process(&self, res: Response) -> Result<Response, Error>;
}

/// ルートハンドラーの特性
///
/// レスポンスはResponseCaptureを通して書き出す。書き出し結果（ステータス、
/// エラー）はディスパッチ後のアクセスログが参照する。
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(
        &self,
        rt: &dyn Router,
        req: Request,
        w: &mut ResponseCapture,
    ) -> Result<(), Error>;
}

/// ハンドラー関数が返すboxed future
pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), Error>>;

/// クロージャをRouteHandlerとして扱うためのアダプタ
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a dyn Router, Request, &'a mut ResponseCapture) -> HandlerFuture<'a>
        + Send
        + Sync,
{
    async fn handle(
        &self,
        rt: &dyn Router,
        req: Request,
        w: &mut ResponseCapture,
    ) -> Result<(), Error> {
        (self.0)(rt, req, w).await
    }
}

/// クロージャからルートハンドラーを作成
///
/// ```ignore
/// let handler = handler_fn(|rt, _req, w| Box::pin(async move {
///     rt.respond_data(w, 200, "text/plain; charset=utf-8", Some(Payload::Text("pong".into())));
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn RouteHandler>
where
    F: for<'a> Fn(&'a dyn Router, Request, &'a mut ResponseCapture) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler(f))
}
