//! LinkScribe: a bookmark service that scrapes submitted pages and files
//! them under a predicted category.

pub mod auth;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::classifier::Classifier;
use crate::config::AuthConfig;
use crate::db::DbConnection;
use crate::extract::Extractor;

/// Dependencies shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub extractor: Extractor,
    pub classifier: Arc<Classifier>,
    pub auth: AuthConfig,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/register", post(handlers::register_user))
        .route("/token", post(handlers::login))
        .route("/users/me", get(handlers::read_users_me))
        .route("/users", get(handlers::list_users))
        .route("/links", post(handlers::create_link).get(handlers::list_links))
        .route("/links/:link_id", delete(handlers::delete_link))
        .route("/predict", post(handlers::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
