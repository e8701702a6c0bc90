pub mod chat;
pub mod config;
pub mod database;
pub mod error;
pub mod filters;
pub mod fixtures;
pub mod handlers;
pub mod models;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::AppConfig;
use database::DatabaseService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: DatabaseService, config: AppConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let receipts = ServeDir::new(&state.config.receipts_dir);

    Router::new()
        // Pages
        .route("/", get(handlers::expenses::index))
        .route(
            "/add-expense",
            get(handlers::expenses::add_expense_form).post(handlers::expenses::create_expense),
        )
        .route("/approve-expenses", get(handlers::approvals::approve_expenses_page))
        .route("/approve-expenses/:id/approve", post(handlers::approvals::approve_expense))
        .route("/approve-expenses/:id/reject", post(handlers::approvals::reject_expense))
        .route(
            "/chat",
            get(handlers::chat::chat_page).post(handlers::chat::chat_message),
        )

        // JSON API
        .route(
            "/api/expenses",
            get(handlers::api::list_expenses).post(handlers::api::create_expense),
        )
        .route("/api/expenses/pending", get(handlers::api::pending_expenses))
        .route("/api/expenses/:id", get(handlers::api::get_expense))
        .route("/api/expenses/:id/status", put(handlers::api::update_expense_status))
        .route("/api/categories", get(handlers::api::list_categories))
        .route("/health", get(handlers::api::health))

        // Static files
        .nest_service("/receipts", receipts)
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
        )
        .with_state(state)
}
