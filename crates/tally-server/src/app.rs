//! Router wiring and shared handler state.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Router;
use axum::handler::Handler;
use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::{self, MethodRouter};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tally_access::RoleGroupGraph;
use tally_auth::{AuthConfig, AuthService, AuthorizationGate, TokenCodec};
use tally_core::resource_key;
use tally_db::{SurrealIdentityRepository, SurrealPermissionStore};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::middleware;

pub type Store = SurrealPermissionStore<Any>;
pub type Identities = SurrealIdentityRepository<Any>;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService<Identities, Store>>,
    pub gate: Arc<AuthorizationGate<Store>>,
    pub graph: Arc<RoleGroupGraph<Store>>,
}

impl AppState {
    pub fn new(db: Surreal<Any>, codec: Arc<TokenCodec>, config: AuthConfig) -> Self {
        let store = SurrealPermissionStore::new(db.clone());
        let timeout = config.store_timeout;
        Self {
            gate: Arc::new(AuthorizationGate::new(codec.clone(), store.clone(), timeout)),
            graph: Arc::new(RoleGroupGraph::new(store.clone())),
            auth: Arc::new(AuthService::new(
                SurrealIdentityRepository::new(db),
                store,
                codec,
                config,
            )),
        }
    }
}

/// Who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any valid access token.
    Authenticated,
    /// A valid token plus a grant on the route's resource key.
    Permissioned,
}

/// Collects routes together with the resource key of each one.
pub struct RouteTable {
    router: Router<AppState>,
    keys: BTreeSet<String>,
    state: AppState,
}

impl RouteTable {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Router::new(),
            keys: BTreeSet::new(),
            state,
        }
    }

    pub fn get<H, T>(self, path: &str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::GET, path, access, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::POST, path, access, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::PUT, path, access, routing::put(handler))
    }

    pub fn delete<H, T>(self, path: &str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::DELETE, path, access, routing::delete(handler))
    }

    fn add(
        mut self,
        method: Method,
        path: &str,
        access: Access,
        route: MethodRouter<AppState>,
    ) -> Self {
        self.keys.insert(resource_key::normalize(method.as_str(), path));
        let route = match access {
            Access::Public => route,
            Access::Authenticated => route.route_layer(from_fn_with_state(
                self.state.clone(),
                middleware::authenticate,
            )),
            Access::Permissioned => route.route_layer(from_fn_with_state(
                self.state.clone(),
                middleware::authorize,
            )),
        };
        self.router = self.router.route(path, route);
        self
    }

    /// Resource keys of every registered route.
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn into_router(self) -> Router {
        self.router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }
}

pub fn route_table(state: AppState) -> RouteTable {
    use Access::*;

    RouteTable::new(state)
        .post("/auth/signin", Public, api::auth::sign_in)
        .post("/auth/signup", Public, api::auth::sign_up)
        .post("/auth/refresh-token", Public, api::auth::refresh_token)
        .get("/auth/public-key", Public, api::auth::public_key)
        .post("/auth/change-password", Authenticated, api::auth::change_password)
        .get("/user/me", Authenticated, api::user::me)
        .put("/user/me", Authenticated, api::user::update_me)
        .get("/user/:uuid", Permissioned, api::user::get_user)
        .put("/user/:uuid", Permissioned, api::user::update_user)
        .get("/permission/resource", Permissioned, api::permission::list_resources)
        .get("/permission/role", Permissioned, api::permission::list_roles)
        .post("/permission/role", Permissioned, api::permission::create_role)
        .get("/permission/role/:uuid", Permissioned, api::permission::get_role)
        .put("/permission/role/:uuid", Permissioned, api::permission::update_role)
        .delete("/permission/role/:uuid", Permissioned, api::permission::delete_role)
        .get("/permission/group", Permissioned, api::permission::list_groups)
        .post("/permission/group", Permissioned, api::permission::create_group)
        .get("/permission/group/:uuid", Permissioned, api::permission::get_group)
        .put("/permission/group/:uuid", Permissioned, api::permission::update_group)
        .delete("/permission/group/:uuid", Permissioned, api::permission::delete_group)
}
