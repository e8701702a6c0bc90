use std::process::ExitCode;

use dotenvy::dotenv;
use log::{error, info, warn};

use expense_management::{
    config::AppConfig, create_router, database::DatabaseService, AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db = DatabaseService::connect(&config.database).await;
    if db.is_fallback() {
        warn!("Running in fallback mode: pages and API serve sample data, writes are disabled");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(db, config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Expense management server starting on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
