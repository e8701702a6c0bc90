#![allow(dead_code)]

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use expense_management::{config::AppConfig, create_router, database::DatabaseService, AppState};
use tokio::net::TcpListener;

static SERVER_COUNT: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub base_url: String,
    pub receipts_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Starts the router on an ephemeral port with the given data service.
pub async fn start_server_with(db: DatabaseService, config: AppConfig) -> anyhow::Result<TestApp> {
    let receipts_dir = config.receipts_dir.clone();
    let app = create_router(AppState::new(db, config));
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp {
        base_url: format!("http://{}", addr),
        receipts_dir,
    })
}

/// Server answering from fixture data, with the chat assistant enabled.
pub async fn start_fixture_server() -> anyhow::Result<TestApp> {
    let mut config = AppConfig::default();
    config.chat.endpoint = Some("https://assistant.invalid".to_string());
    config.chat.deployment_name = Some("expenses".to_string());
    let n = SERVER_COUNT.fetch_add(1, Ordering::Relaxed);
    config.receipts_dir = std::env::temp_dir().join(format!("receipts-{}-{}", std::process::id(), n));
    start_server_with(DatabaseService::fixtures_only(), config).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client")
}
