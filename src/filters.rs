use askama::Result;
use chrono::NaiveDate;

use crate::models::ExpenseStatus;

// Custom template filters, used as `{{ value|filter_name }}`.

pub fn uk_date(date: &NaiveDate) -> Result<String> {
    Ok(date.format("%d/%m/%Y").to_string())
}

/// CSS badge class for a status id.
pub fn status_class(status_id: &i32) -> Result<&'static str> {
    Ok(match ExpenseStatus::from_id(*status_id) {
        Some(ExpenseStatus::Draft) => "badge-draft",
        Some(ExpenseStatus::Submitted) => "badge-submitted",
        Some(ExpenseStatus::Approved) => "badge-approved",
        Some(ExpenseStatus::Rejected) => "badge-rejected",
        None => "badge-unknown",
    })
}
