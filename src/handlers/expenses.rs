use axum::{
    extract::{Query, State},
    response::Html,
};
use axum_extra::extract::Multipart;
use askama::Template;
use chrono::{Local, NaiveDate};
use log::{error, warn};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{path::Path, str::FromStr};
use tokio::fs;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    filters,
    models::{apply_text_filter, CreateExpenseRequest, Expense, ExpenseCategory},
    AppState,
};

const RECEIPT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub filter: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    expenses: Vec<Expense>,
    filter: String,
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "add_expense.html")]
struct AddExpenseTemplate {
    categories: Vec<ExpenseCategory>,
    submitter_name: String,
    form: ExpenseForm,
    success: Option<String>,
    error: Option<String>,
    notice: Option<String>,
}

// Raw form values, kept as text so a rejected submission can be shown again.
#[derive(Debug, Clone, Default)]
struct ExpenseForm {
    amount: String,
    date: String,
    category_id: i32,
    description: String,
}

impl ExpenseForm {
    fn blank() -> Self {
        Self {
            date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    fn to_request(&self) -> Option<CreateExpenseRequest> {
        let amount = Decimal::from_str(self.amount.trim()).ok()?;
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        if self.category_id <= 0 {
            return None;
        }
        Some(CreateExpenseRequest {
            amount,
            date,
            category_id: self.category_id,
            description: Some(self.description.clone()),
            receipt_file: None,
        })
    }
}

struct ReceiptData {
    filename: String,
    data: axum::body::Bytes,
}

/// Shown on pages while the service is answering from fixture data.
pub(crate) fn fallback_notice(state: &AppState) -> Option<String> {
    if state.db.is_fallback() {
        Some(
            state
                .db
                .last_error()
                .unwrap_or_else(|| "The database is unavailable; showing sample data.".to_string()),
        )
    } else {
        None
    }
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> AppResult<Html<String>> {
    let expenses = state.db.get_expenses(None, None).await;
    let expenses = apply_text_filter(expenses, query.filter.as_deref(), true);

    let template = IndexTemplate {
        expenses,
        filter: query.filter.unwrap_or_default(),
        notice: fallback_notice(&state),
    };
    Ok(Html(template.render()?))
}

pub async fn add_expense_form(State(state): State<AppState>) -> AppResult<Html<String>> {
    render_add_expense(&state, ExpenseForm::blank(), None, None).await
}

pub async fn create_expense(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Html<String>> {
    let (form, receipt) = parse_expense_multipart(multipart).await?;

    let Some(mut request) = form.to_request() else {
        return render_add_expense(
            &state,
            form,
            None,
            Some("Please fill in all required fields.".to_string()),
        )
        .await;
    };
    if let Err(e) = request.validate() {
        return render_add_expense(&state, form, None, Some(e.public_message())).await;
    }

    request.receipt_file = match save_receipt(&state.config.receipts_dir, receipt).await {
        Ok(file) => file,
        Err(AppError::BadRequest(msg)) => return render_add_expense(&state, form, None, Some(msg)).await,
        Err(e) => return Err(e),
    };

    match state.db.create_expense(&request, state.config.submitter_user_id).await {
        Ok(expense_id) => {
            let success = format!("Expense created successfully (ID: {})", expense_id);
            render_add_expense(&state, ExpenseForm::blank(), Some(success), None).await
        }
        Err(e) => {
            warn!("Expense form submission failed: {}", e);
            discard_receipt(&state.config.receipts_dir, request.receipt_file.as_deref()).await;
            let message = format!("Error creating expense: {}", e.public_message());
            render_add_expense(&state, form, None, Some(message)).await
        }
    }
}

async fn render_add_expense(
    state: &AppState,
    form: ExpenseForm,
    success: Option<String>,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let categories = state.db.get_categories().await;
    let submitter_name = state
        .db
        .get_user(state.config.submitter_user_id)
        .await
        .map(|u| u.user_name)
        .unwrap_or_else(|| format!("User {}", state.config.submitter_user_id));

    let template = AddExpenseTemplate {
        categories,
        submitter_name,
        form,
        success,
        error,
        notice: fallback_notice(state),
    };
    Ok(Html(template.render()?))
}

async fn parse_expense_multipart(mut multipart: Multipart) -> AppResult<(ExpenseForm, Option<ReceiptData>)> {
    let mut form = ExpenseForm::default();
    let mut receipt_data = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Malformed form submission".to_string()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "receipt" {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|_| AppError::BadRequest("Could not read the receipt upload".to_string()))?;
            if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                if !data.is_empty() {
                    receipt_data = Some(ReceiptData { filename, data });
                }
            }
        } else {
            let text_value = field
                .text()
                .await
                .map_err(|_| AppError::BadRequest("Malformed form submission".to_string()))?;

            match name.as_str() {
                "amount" => form.amount = text_value,
                "date" => form.date = text_value,
                "category_id" => form.category_id = text_value.trim().parse().unwrap_or(0),
                "description" => form.description = text_value,
                _ => (),
            }
        }
    }
    Ok((form, receipt_data))
}

/// Stores an uploaded receipt under a random name and returns that name.
async fn save_receipt(receipts_dir: &Path, receipt: Option<ReceiptData>) -> AppResult<Option<String>> {
    let Some(receipt) = receipt else {
        return Ok(None);
    };

    let extension = Path::new(&receipt.filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !RECEIPT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest("Receipts must be PNG or JPEG images".to_string()));
    }

    fs::create_dir_all(receipts_dir).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    if let Err(e) = fs::write(receipts_dir.join(&file_name), &receipt.data).await {
        error!("Failed to store receipt {}: {}", file_name, e);
        return Err(e.into());
    }
    Ok(Some(file_name))
}

// The expense row was never written, so its receipt has no owner.
async fn discard_receipt(receipts_dir: &Path, file_name: Option<&str>) {
    let Some(file_name) = file_name else {
        return;
    };
    if let Err(e) = fs::remove_file(receipts_dir.join(file_name)).await {
        error!("Failed to remove orphaned receipt {}: {}", file_name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(amount: &str, date: &str, category_id: i32) -> ExpenseForm {
        ExpenseForm {
            amount: amount.to_string(),
            date: date.to_string(),
            category_id,
            description: "Parking".to_string(),
        }
    }

    #[test]
    fn complete_form_becomes_request() {
        let request = form("7.50", "2024-02-29", 4).to_request().unwrap();
        assert_eq!(request.amount_minor().unwrap(), 750);
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(request.category_id, 4);
    }

    #[test]
    fn incomplete_form_is_rejected() {
        assert!(form("", "2024-02-29", 4).to_request().is_none());
        assert!(form("abc", "2024-02-29", 4).to_request().is_none());
        assert!(form("7.50", "29/02/2024", 4).to_request().is_none());
        assert!(form("7.50", "2024-02-29", 0).to_request().is_none());
    }

    #[tokio::test]
    async fn receipt_with_unsupported_extension_is_refused() {
        let dir = std::env::temp_dir().join(format!("receipts-{}", Uuid::new_v4()));
        let receipt = ReceiptData {
            filename: "invoice.pdf".to_string(),
            data: axum::body::Bytes::from_static(b"%PDF"),
        };
        assert!(matches!(
            save_receipt(&dir, Some(receipt)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(save_receipt(&dir, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn receipt_is_stored_under_random_name() {
        let dir = std::env::temp_dir().join(format!("receipts-{}", Uuid::new_v4()));
        let receipt = ReceiptData {
            filename: "Lunch.JPG".to_string(),
            data: axum::body::Bytes::from_static(b"\xff\xd8\xff"),
        };
        let name = save_receipt(&dir, Some(receipt)).await.unwrap().unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(fs::read(dir.join(&name)).await.unwrap(), b"\xff\xd8\xff");
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn discarded_receipt_is_removed() {
        let dir = std::env::temp_dir().join(format!("receipts-{}", Uuid::new_v4()));
        let receipt = ReceiptData {
            filename: "taxi.png".to_string(),
            data: axum::body::Bytes::from_static(b"\x89PNG"),
        };
        let name = save_receipt(&dir, Some(receipt)).await.unwrap().unwrap();
        discard_receipt(&dir, Some(&name)).await;
        discard_receipt(&dir, None).await;
        assert!(!dir.join(&name).exists());
        let _ = fs::remove_dir_all(&dir).await;
    }
}
