//! クッキーベースのセッション管理
//!
//! 永続化はSessionStoreに委譲し、このレイヤーはクッキーの発行・検証・
//! 破棄の手順のみを持つ。

pub mod store;

pub use store::{MemoryStore, Session, SessionOptions, SessionStore};

use std::sync::Arc;

use log::error;

use crate::common::cookie::Cookie;
use crate::common::http::Request;
use crate::error::Error;
use crate::respond::ResponseCapture;

/// セッション開始時の設定
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// クッキー名
    pub cookie_name: String,
    /// セッション内でユーザーIDを保持するキー
    pub cookie_key: String,
    /// クッキーの有効期間（秒）
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
}

impl SessionConfig {
    /// 新しいSessionConfigを作成
    pub fn new(cookie_name: impl Into<String>, cookie_key: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            cookie_key: cookie_key.into(),
            max_age: 0,
            secure: false,
            http_only: false,
        }
    }

    /// 有効期間（秒）を設定
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// セキュアフラグを設定
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// HttpOnlyフラグを設定
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

/// セッションの開始・検証・破棄
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    /// 新しいSessionManagerを作成
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// ログイン後の新規セッションを開始する
    ///
    /// 同じクッキー名の既存セッションは先に無効化される。
    /// ストアの割り当て・保存に失敗した場合はエラーを返す。
    pub async fn start(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        user_id: &str,
        config: &SessionConfig,
    ) -> Result<(), Error> {
        self.close(w, req, &config.cookie_name, &config.cookie_key)
            .await;

        let mut session = self.store.new_session(&config.cookie_name).await?;
        session.values
            .insert(config.cookie_key.clone(), user_id.to_string());
        session.options = SessionOptions {
            path: "/".to_string(),
            max_age: config.max_age,
            secure: config.secure,
            http_only: config.http_only,
        };
        self.store.save(&session).await?;

        let cookie = Cookie::try_new(session.name.as_str(), session.id.as_str())?
            .with_path(session.options.path.as_str())
            .with_max_age(config.max_age)
            .secure(config.secure)
            .http_only(config.http_only);
        // closeが積んだ失効クッキーは新しいSet-Cookieで上書きされる
        w.set_header("Set-Cookie", cookie.to_header_value());
        Ok(())
    }

    /// ログイン済みかを検証し、保存されたユーザーIDを返す
    ///
    /// キーが存在しない、またはセッションが失効状態（max_age < 0）の場合は
    /// Unauthorizedを返す。
    pub async fn check(
        &self,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    ) -> Result<String, Error> {
        let cookie_value = req.cookie(cookie_name);
        let session = self.store.get(cookie_name, cookie_value.as_deref()).await?;

        match session.values.get(cookie_key) {
            Some(user_id) if !session.options.is_expired() => Ok(user_id.clone()),
            _ => Err(Error::Unauthorized),
        }
    }

    /// セッションを閉じる
    ///
    /// 追跡キーを取り除き、明示的な失効状態へ遷移させて保存する。
    /// 永続化の失敗は呼び出し元のレスポンス処理を妨げないよう、
    /// ログに残すのみで伝播させない。
    pub async fn close(
        &self,
        w: &mut ResponseCapture,
        req: &Request,
        cookie_name: &str,
        cookie_key: &str,
    ) {
        let cookie_value = req.cookie(cookie_name);
        let mut session = match self.store.get(cookie_name, cookie_value.as_deref()).await {
            Ok(s) => s,
            Err(e) => {
                error!("session load error: {}", e);
                return;
            }
        };

        if session.is_new {
            // 既存セッションがなければ何もしない
            return;
        }

        session.values.remove(cookie_key);
        session.options = SessionOptions::expired();
        if let Err(e) = self.store.save(&session).await {
            error!("session save error: {}", e);
        }

        match Cookie::try_new(cookie_name, session.id.as_str()) {
            Ok(cookie) => {
                w.set_header(
                    "Set-Cookie",
                    cookie.with_path("/").with_max_age(-1).to_header_value(),
                );
            }
            Err(e) => error!("session cookie encode error: {}", e),
        }
    }
}
