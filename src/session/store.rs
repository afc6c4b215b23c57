//! セッションストア（永続化の境界と組込み実装）

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;

/// クッキーに載せるセッション属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub path: String,
    /// 秒数。負の値は失効済み（ログアウト済み）を意味する
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: 0,
            secure: false,
            http_only: false,
        }
    }
}

impl SessionOptions {
    /// 失効済み状態のオプション
    ///
    /// セッションクローズ時に明示的にこの状態へ遷移させる。
    pub fn expired() -> Self {
        Self {
            max_age: -1,
            ..Self::default()
        }
    }

    /// 失効済みかどうか
    pub fn is_expired(&self) -> bool {
        self.max_age < 0
    }
}

/// セッションレコード
#[derive(Debug, Clone)]
pub struct Session {
    /// ストアが割り当てた識別子（クッキー値として配布される）
    pub id: String,
    /// クッキー名
    pub name: String,
    /// セッションに紐づくキー・バリュー
    pub values: HashMap<String, String>,
    /// クッキー属性
    pub options: SessionOptions,
    /// ストアに未保存の新規セッションかどうか
    pub is_new: bool,
}

/// セッション永続化の境界
///
/// 並行安全性は実装側の責務。このレイヤーはロックを跨いだ待機を行わない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 新しい空のセッションを割り当てる（未保存）
    async fn new_session(&self, name: &str) -> Result<Session, Error>;

    /// クッキー値からセッションを取得する
    ///
    /// クッキーがない、または未知のIDの場合は新規セッションを返す。
    async fn get<'a>(&self, name: &str, cookie_value: Option<&'a str>) -> Result<Session, Error>;

    /// セッションを保存する
    async fn save(&self, session: &Session) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    values: HashMap<String, String>,
    options: SessionOptions,
}

/// プロセス内メモリ上のセッションストア
///
/// セッションIDはUUID v4。テストおよび単一プロセス構成向けの組込み実装。
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    /// 新しいMemoryStoreを作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn new_session(&self, name: &str) -> Result<Session, Error> {
        Ok(Session {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            values: HashMap::new(),
            options: SessionOptions::default(),
            is_new: true,
        })
    }

    async fn get<'a>(&self, name: &str, cookie_value: Option<&'a str>) -> Result<Session, Error> {
        if let Some(id) = cookie_value {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| Error::SessionStoreError("session store lock poisoned".into()))?;
            if let Some(stored) = sessions.get(id) {
                return Ok(Session {
                    id: id.to_string(),
                    name: name.to_string(),
                    values: stored.values.clone(),
                    options: stored.options.clone(),
                    is_new: false,
                });
            }
        }
        self.new_session(name).await
    }

    async fn save(&self, session: &Session) -> Result<(), Error> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| Error::SessionStoreError("session store lock poisoned".into()))?;
        sessions.insert(
            session.id.clone(),
            StoredSession {
                values: session.values.clone(),
                options: session.options.clone(),
            },
        );
        Ok(())
    }
}
