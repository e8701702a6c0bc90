use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CURRENCY: &str = "GBP";
/// Width of `expenses.description`, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseStatus {
    Draft = 1,
    Submitted = 2,
    Approved = 3,
    Rejected = 4,
}

impl ExpenseStatus {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "Draft",
            ExpenseStatus::Submitted => "Submitted",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Rejected => "Rejected",
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(ExpenseStatus::Draft),
            2 => Some(ExpenseStatus::Submitted),
            3 => Some(ExpenseStatus::Approved),
            4 => Some(ExpenseStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
}

// Expense joined with its user, category and status names.
#[derive(Debug, Clone, FromRow)]
pub struct Expense {
    pub id: i32,
    pub user_id: i32,
    pub category_id: i32,
    pub status_id: i32,
    pub amount_minor: i64,
    pub currency: String,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_file: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub category_name: String,
    pub status_name: String,
}

impl Expense {
    /// Major-unit amount, always with two decimal places.
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_minor, 2)
    }

    pub fn display_amount(&self) -> String {
        format!("{}{:.2}", currency_symbol(&self.currency), self.amount())
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn status(&self) -> Option<ExpenseStatus> {
        ExpenseStatus::from_id(self.status_id)
    }

    /// Case-insensitive substring match against the category, the description
    /// and, when `include_status` is set, the status name.
    pub fn matches_filter(&self, needle: &str, include_status: bool) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.category_name.to_lowercase().contains(&needle)
            || self.description_text().to_lowercase().contains(&needle)
            || (include_status && self.status_name.to_lowercase().contains(&needle))
    }
}

pub fn currency_symbol(currency: &str) -> String {
    match currency {
        "GBP" => "£".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        other => format!("{} ", other),
    }
}

/// Keeps only the expenses matching a free-text filter; a blank filter keeps all.
pub fn apply_text_filter(expenses: Vec<Expense>, filter: Option<&str>, include_status: bool) -> Vec<Expense> {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(needle) => expenses
            .into_iter()
            .filter(|e| e.matches_filter(needle, include_status))
            .collect(),
        None => expenses,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResponse {
    pub id: i32,
    pub user_id: i32,
    pub category_id: i32,
    pub status_id: i32,
    pub amount_minor: i64,
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub receipt_file: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub category_name: String,
    pub status_name: String,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            amount: expense.amount(),
            id: expense.id,
            user_id: expense.user_id,
            category_id: expense.category_id,
            status_id: expense.status_id,
            amount_minor: expense.amount_minor,
            currency: expense.currency,
            date: expense.expense_date,
            description: expense.description,
            receipt_file: expense.receipt_file,
            submitted_at: expense.submitted_at,
            reviewed_by: expense.reviewed_by,
            reviewed_at: expense.reviewed_at,
            created_at: expense.created_at,
            user_name: expense.user_name,
            category_name: expense.category_name,
            status_name: expense.status_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_file: Option<String>,
}

impl CreateExpenseRequest {
    /// Converts the major-unit amount to pence, rounding half away from zero
    /// at the second decimal place.
    pub fn amount_minor(&self) -> AppResult<i64> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("Amount must be greater than zero".to_string()));
        }
        (self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) * Decimal::ONE_HUNDRED)
            .to_i64()
            .ok_or_else(|| AppError::BadRequest("Amount is too large".to_string()))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.category_id <= 0 {
            return Err(AppError::BadRequest("A category must be selected".to_string()));
        }
        self.amount_minor()?;
        if self
            .trimmed_description()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(AppError::BadRequest(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        Ok(())
    }

    pub fn trimmed_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseStatusRequest {
    pub expense_id: i32,
    pub new_status_id: i32,
    pub reviewer_id: Option<i32>,
}
