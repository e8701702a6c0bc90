use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{CreateExpenseRequest, ExpenseCategory, ExpenseResponse, ExpenseStatus, UpdateExpenseStatusRequest},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    status_id: Option<i32>,
    user_id: Option<i32>,
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> Json<Vec<ExpenseResponse>> {
    let expenses = state
        .db
        .get_expenses(query.status_id, query.user_id)
        .await
        .into_iter()
        .map(ExpenseResponse::from)
        .collect();
    Json(expenses)
}

pub async fn pending_expenses(State(state): State<AppState>) -> Json<Vec<ExpenseResponse>> {
    let expenses = state
        .db
        .get_expenses(Some(ExpenseStatus::Submitted.id()), None)
        .await
        .into_iter()
        .map(ExpenseResponse::from)
        .collect();
    Json(expenses)
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<i32>,
) -> AppResult<Json<ExpenseResponse>> {
    let expense = state
        .db
        .get_expense(expense_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Expense with ID {} not found", expense_id)))?;
    Ok(Json(expense.into()))
}

pub async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let expense_id = state
        .db
        .create_expense(&request, state.config.submitter_user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/expenses/{}", expense_id))],
        Json(json!({ "expenseId": expense_id })),
    ))
}

pub async fn update_expense_status(
    State(state): State<AppState>,
    Path(expense_id): Path<i32>,
    payload: Result<Json<UpdateExpenseStatusRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(request) = payload?;
    if expense_id != request.expense_id {
        return Err(AppError::BadRequest("ID mismatch".to_string()));
    }
    let status = ExpenseStatus::from_id(request.new_status_id)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status id {}", request.new_status_id)))?;

    if state
        .db
        .update_expense_status(expense_id, status, request.reviewer_id)
        .await?
    {
        Ok(Json(json!({ "message": "Status updated successfully" })))
    } else {
        Err(AppError::NotFound("Expense not found".to_string()))
    }
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<ExpenseCategory>> {
    Json(state.db.get_categories().await)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let status = state.db.status();
    Json(json!({ "status": "ok", "mode": status.mode }))
}
