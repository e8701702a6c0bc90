//! Keyword-driven assistant for the chat page.
//!
//! The reply is chosen by the first rule whose keyword appears in the
//! lower-cased message; answers are built from the same data the pages show.

use std::fmt::Write;

use crate::{
    database::DatabaseService,
    filters,
    models::{Expense, ExpenseStatus},
};

const SUMMARY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Pending,
    ListExpenses,
    Categories,
    Help,
    Unknown,
}

impl Intent {
    pub fn detect(message: &str) -> Self {
        let msg = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| msg.contains(w));

        if has(&["show", "list", "expense"]) {
            Intent::ListExpenses
        } else if has(&["pending", "submit"]) {
            Intent::Pending
        } else if has(&["categor"]) {
            Intent::Categories
        } else if has(&["help"]) {
            Intent::Help
        } else {
            Intent::Unknown
        }
    }
}

pub async fn respond(db: &DatabaseService, message: &str) -> String {
    match Intent::detect(message) {
        Intent::Pending => {
            let pending = db.get_expenses(Some(ExpenseStatus::Submitted.id()), None).await;
            if pending.is_empty() {
                "No pending expenses at the moment.".to_string()
            } else {
                format!("There are {} pending expenses waiting for approval.", pending.len())
            }
        }
        Intent::ListExpenses => summarize(&db.get_expenses(None, None).await),
        Intent::Categories => {
            let names: Vec<String> = db.get_categories().await.into_iter().map(|c| c.name).collect();
            format!("Available categories: {}", names.join(", "))
        }
        Intent::Help => "I can help you with:\n\
            • View all expenses\n\
            • Check pending expenses\n\
            • List categories\n\
            • Get expense information"
            .to_string(),
        Intent::Unknown => "I understand you're asking about expenses. Try asking to 'show expenses', \
            'what is pending', or 'show categories'."
            .to_string(),
    }
}

fn summarize(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses found in the system.".to_string();
    }

    let mut summary = format!("I found {} expenses:\n\n", expenses.len());
    for expense in expenses.iter().take(SUMMARY_LIMIT) {
        let date = filters::uk_date(&expense.expense_date).unwrap_or_default();
        let _ = writeln!(
            summary,
            "• {} - {}: {} ({})",
            date,
            expense.category_name,
            expense.display_amount(),
            expense.status_name
        );
    }
    if expenses.len() > SUMMARY_LIMIT {
        let _ = write!(
            summary,
            "\n...and {} more. Visit the main page to see all expenses.",
            expenses.len() - SUMMARY_LIMIT
        );
    }
    summary
}
