//! ルートテーブルとサブパスグループ
//!
//! 登録は構成ルートが所有するRegistryに対してのみ行い、トラフィック開始前に
//! 確定させる。稼働中の遅延生成は設計として許容しない。

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::common::http::Method;
use crate::common::traits::{Middleware, RouteHandler};
use crate::error::Error;
use super::pattern::PathPattern;

/// 登録済みルート
pub struct Route {
    pub(crate) pattern: PathPattern,
    pub(crate) methods: Vec<Method>,
    pub(crate) handler: Arc<dyn RouteHandler>,
}

/// URLプレフィックスとミドルウェアチェーンを共有するルートの名前空間
pub struct RouteGroup {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) routes: Vec<Route>,
}

/// ルート検索の結果
pub(crate) enum RouteMatch<'a> {
    Found {
        route: &'a Route,
        group: &'a RouteGroup,
        params: HashMap<String, String>,
    },
    /// パスは一致したがメソッドが許可されていない
    MethodNotAllowed,
    NotFound,
}

/// ルートテーブル
///
/// グループはプレフィックスをキーに一度だけ作られる（冪等）。
/// グループに登録されたミドルウェアは、登録順のまま、そのグループの
/// すべてのルート（登録済み・今後登録されるものの両方）に適用される。
pub struct Registry {
    groups: Vec<RouteGroup>,
    index: HashMap<String, usize>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// 新しいRegistryを作成（ルートグループはプレフィックス""で常に存在する）
    pub fn new() -> Self {
        let root = RouteGroup {
            prefix: String::new(),
            middlewares: Vec::new(),
            routes: Vec::new(),
        };
        let mut index = HashMap::new();
        index.insert(String::new(), 0);
        Self {
            groups: vec![root],
            index,
        }
    }

    /// ルートを登録する
    ///
    /// subrouteが空ならルートグループ、そうでなければそのプレフィックスの
    /// グループに登録される。パターンはプレフィックスを含めた完全パスとして
    /// コンパイルされる。メソッドの許可リストは必須。
    pub fn add_route(
        &mut self,
        subroute: &str,
        template: &str,
        methods: &[Method],
        handler: Arc<dyn RouteHandler>,
    ) -> Result<(), Error> {
        if methods.is_empty() {
            return Err(Error::InvalidRoutePattern(format!(
                "no methods given for route: {}",
                template
            )));
        }

        let full_template = if subroute.is_empty() {
            template.to_string()
        } else {
            format!("{}{}", subroute, template)
        };
        let pattern = PathPattern::parse(&full_template)?;

        debug!(
            "Registering route {} for {:?}",
            pattern.template(),
            methods
        );

        let idx = self.group_index(subroute);
        self.groups[idx].routes.push(Route {
            pattern,
            methods: methods.to_vec(),
            handler,
        });
        Ok(())
    }

    /// ミドルウェアを登録する
    ///
    /// subrouteが空ならすべてのルートに、そうでなければそのグループの
    /// ルートにのみ適用される。
    pub fn add_middleware(&mut self, subroute: &str, middleware: Arc<dyn Middleware>) {
        let idx = self.group_index(subroute);
        self.groups[idx].middlewares.push(middleware);
    }

    /// グループ数（ルートグループ含む）
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// グローバルミドルウェア（ルートグループのチェーン）
    pub(crate) fn global_middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.groups[0].middlewares
    }

    /// プレフィックスからグループを検索し、なければ作成する
    fn group_index(&mut self, prefix: &str) -> usize {
        if let Some(&idx) = self.index.get(prefix) {
            return idx;
        }
        let idx = self.groups.len();
        self.groups.push(RouteGroup {
            prefix: prefix.to_string(),
            middlewares: Vec::new(),
            routes: Vec::new(),
        });
        self.index.insert(prefix.to_string(), idx);
        idx
    }

    /// パスとメソッドに一致するルートを検索する
    pub(crate) fn find(&self, path: &str, method: Method) -> RouteMatch<'_> {
        let mut path_matched = false;

        for group in &self.groups {
            if !group.prefix.is_empty() && !path.starts_with(group.prefix.as_str()) {
                continue;
            }
            for route in &group.routes {
                if let Some(params) = route.pattern.matches(path) {
                    if route.methods.contains(&method) {
                        return RouteMatch::Found {
                            route,
                            group,
                            params,
                        };
                    }
                    path_matched = true;
                }
            }
        }

        if path_matched {
            RouteMatch::MethodNotAllowed
        } else {
            RouteMatch::NotFound
        }
    }
}
