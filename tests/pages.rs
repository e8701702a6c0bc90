mod common;

use expense_management::{config::AppConfig, database::DatabaseService};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use common::{client, start_fixture_server, start_server_with};

#[tokio::test]
async fn index_lists_and_filters_expenses() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let c = client();

    let html = c.get(app.url("/")).send().await?.text().await?;
    assert!(html.contains("Taxi to client site"));
    assert!(html.contains("£120.00"));
    assert!(html.contains("15/01/2024"));

    let html = c.get(app.url("/?filter=REJECTED")).send().await?.text().await?;
    assert!(html.contains("Bus fare"));
    assert!(!html.contains("Team lunch"));
    Ok(())
}

#[tokio::test]
async fn add_expense_form_lists_categories() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let html = client().get(app.url("/add-expense")).send().await?.text().await?;
    assert!(html.contains("Office Supplies"));
    assert!(html.contains("Submitting as Alice Example"));
    Ok(())
}

#[tokio::test]
async fn add_expense_reports_missing_fields() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let form = reqwest::multipart::Form::new()
        .text("amount", "")
        .text("date", "2024-02-01")
        .text("category_id", "1");
    let res = client().post(app.url("/add-expense")).multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await?.contains("Please fill in all required fields."));
    Ok(())
}

#[tokio::test]
async fn add_expense_in_fallback_mode_shows_error() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let form = reqwest::multipart::Form::new()
        .text("amount", "12.50")
        .text("date", "2024-02-01")
        .text("category_id", "2")
        .text("description", "Sandwiches");
    let html = client().post(app.url("/add-expense")).multipart(form).send().await?.text().await?;
    assert!(html.contains("Error creating expense"));
    // values survive the failed submission
    assert!(html.contains("Sandwiches"));
    Ok(())
}

#[tokio::test]
async fn failed_add_expense_keeps_no_receipt() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let receipt = reqwest::multipart::Part::bytes(b"\xff\xd8\xff".to_vec())
        .file_name("r.jpg")
        .mime_str("image/jpeg")?;
    let form = reqwest::multipart::Form::new()
        .text("amount", "12.50")
        .text("date", "2024-02-01")
        .text("category_id", "2")
        .text("description", "Sandwiches")
        .part("receipt", receipt);
    let html = client().post(app.url("/add-expense")).multipart(form).send().await?.text().await?;
    assert!(html.contains("Error creating expense"));

    let mut stored = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(&app.receipts_dir).await {
        while let Some(entry) = entries.next_entry().await? {
            stored.push(entry.file_name());
        }
    }
    assert!(stored.is_empty(), "orphaned receipts: {:?}", stored);
    Ok(())
}

#[tokio::test]
async fn approve_page_shows_submitted_only() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let html = client().get(app.url("/approve-expenses")).send().await?.text().await?;
    assert!(html.contains("Taxi to client site"));
    assert!(html.contains("Team lunch"));
    assert!(!html.contains("Bus fare"));
    assert!(html.contains("Reviewing as Bob Manager"));

    let html = client()
        .get(app.url("/approve-expenses?filter=lunch"))
        .send()
        .await?
        .text()
        .await?;
    assert!(html.contains("Team lunch"));
    assert!(!html.contains("Taxi to client site"));
    Ok(())
}

#[tokio::test]
async fn approving_redirects_with_flash_cookie() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let res = client().post(app.url("/approve-expenses/1/approve")).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/approve-expenses");

    let cookie = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("flash="))
        .map(str::to_string);
    let cookie = cookie.expect("flash cookie");
    assert!(cookie.starts_with("flash=error:"));

    // the flash is rendered once on the next page view
    let pair = cookie.split(';').next().unwrap_or_default().to_string();
    let html = client()
        .get(app.url("/approve-expenses"))
        .header(header::COOKIE, pair)
        .send()
        .await?
        .text()
        .await?;
    assert!(html.contains("Failed to update expense 1"));
    Ok(())
}

#[tokio::test]
async fn chat_answers_keywords() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let c = client();

    let body: Value = c
        .post(app.url("/chat"))
        .json(&json!({ "userMessage": "How many are pending?" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "There are 2 pending expenses waiting for approval.");
    assert!(body.get("isDummyResponse").is_none());

    let body: Value = c
        .post(app.url("/chat"))
        .json(&json!({ "messages": [{ "role": "user", "content": "show categories" }] }))
        .send()
        .await?
        .json()
        .await?;
    // "show" is checked before "categor"
    assert!(body["message"].as_str().unwrap_or_default().starts_with("I found 4 expenses:"));

    let body: Value = c
        .post(app.url("/chat"))
        .json(&json!({ "userMessage": "pending expenses" }))
        .send()
        .await?
        .json()
        .await?;
    // "expense" is checked before "pending"
    assert!(body["message"].as_str().unwrap_or_default().starts_with("I found 4 expenses:"));
    Ok(())
}

#[tokio::test]
async fn chat_rejects_unreadable_payload() -> anyhow::Result<()> {
    let app = start_fixture_server().await?;
    let body: Value = client()
        .post(app.url("/chat"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["isDummyResponse"], true);
    Ok(())
}

#[tokio::test]
async fn chat_without_configuration_is_a_dummy_response() -> anyhow::Result<()> {
    let app = start_server_with(DatabaseService::fixtures_only(), AppConfig::default()).await?;
    let c = client();

    let body: Value = c
        .post(app.url("/chat"))
        .json(&json!({ "userMessage": "help" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["isDummyResponse"], true);

    let html = c.get(app.url("/chat")).send().await?.text().await?;
    assert!(html.contains("not configured"));
    Ok(())
}
