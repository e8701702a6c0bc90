use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use askama::Template;
use log::warn;
use tower_cookies::Cookies;

use crate::{
    error::AppResult,
    filters,
    handlers::expenses::{fallback_notice, FilterQuery},
    models::{apply_text_filter, Expense, ExpenseStatus},
    utils::{set_flash, take_flash, Flash},
    AppState,
};

const APPROVE_PAGE: &str = "/approve-expenses";

#[derive(Template)]
#[template(path = "approve_expenses.html")]
struct ApproveExpensesTemplate {
    expenses: Vec<Expense>,
    filter: String,
    reviewer_name: String,
    flash: Option<Flash>,
    notice: Option<String>,
}

pub async fn approve_expenses_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<FilterQuery>,
) -> AppResult<Html<String>> {
    let pending = state
        .db
        .get_expenses(Some(ExpenseStatus::Submitted.id()), None)
        .await;
    let filter = query.filter.unwrap_or_default();
    let expenses = apply_text_filter(pending, Some(&filter), false);

    let reviewer_name = state
        .db
        .get_user(state.config.reviewer_user_id)
        .await
        .map(|u| u.user_name)
        .unwrap_or_else(|| format!("User {}", state.config.reviewer_user_id));

    let template = ApproveExpensesTemplate {
        expenses,
        filter,
        reviewer_name,
        flash: take_flash(&cookies),
        notice: fallback_notice(&state),
    };
    Ok(Html(template.render()?))
}

pub async fn approve_expense(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(expense_id): Path<i32>,
) -> Redirect {
    review(&state, &cookies, expense_id, ExpenseStatus::Approved).await
}

pub async fn reject_expense(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(expense_id): Path<i32>,
) -> Redirect {
    review(&state, &cookies, expense_id, ExpenseStatus::Rejected).await
}

async fn review(state: &AppState, cookies: &Cookies, expense_id: i32, outcome: ExpenseStatus) -> Redirect {
    let reviewer = Some(state.config.reviewer_user_id);
    let flash = match state.db.update_expense_status(expense_id, outcome, reviewer).await {
        Ok(true) => match outcome {
            ExpenseStatus::Approved => Flash::success(format!("Expense {} approved successfully.", expense_id)),
            _ => Flash::success(format!("Expense {} rejected.", expense_id)),
        },
        Ok(false) => Flash::error(format!("Expense {} was not found.", expense_id)),
        Err(e) => {
            warn!("Review of expense {} failed: {}", expense_id, e);
            Flash::error(format!("Failed to update expense {}: {}", expense_id, e.public_message()))
        }
    };
    set_flash(cookies, flash);
    Redirect::to(APPROVE_PAGE)
}
