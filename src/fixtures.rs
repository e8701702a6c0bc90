//! Fixed sample data served while the database is unreachable.

use chrono::{NaiveDate, Utc};

use crate::models::{Expense, ExpenseCategory, ExpenseStatus, User, DEFAULT_CURRENCY};

const CATEGORIES: [(i32, &str); 4] = [
    (1, "Travel"),
    (2, "Food"),
    (3, "Office Supplies"),
    (4, "Transport"),
];

// (id, category id, status, pence, (y, m, d), description)
const EXPENSES: [(i32, i32, ExpenseStatus, i64, (i32, u32, u32), &str); 4] = [
    (1, 1, ExpenseStatus::Submitted, 12000, (2024, 1, 15), "Taxi to client site"),
    (2, 2, ExpenseStatus::Submitted, 6900, (2023, 1, 10), "Team lunch"),
    (3, 3, ExpenseStatus::Approved, 9950, (2023, 12, 4), "Notebooks and pens"),
    (4, 4, ExpenseStatus::Rejected, 1920, (2023, 12, 18), "Bus fare"),
];

pub fn categories() -> Vec<ExpenseCategory> {
    CATEGORIES
        .iter()
        .map(|&(id, name)| ExpenseCategory {
            id,
            name: name.to_string(),
            is_active: true,
        })
        .collect()
}

pub fn users() -> Vec<User> {
    let now = Utc::now();
    vec![
        User {
            id: 1,
            user_name: "Alice Example".to_string(),
            email: "alice@example.co.uk".to_string(),
            role_id: 1,
            manager_id: Some(2),
            is_active: true,
            created_at: now,
        },
        User {
            id: 2,
            user_name: "Bob Manager".to_string(),
            email: "bob.manager@example.co.uk".to_string(),
            role_id: 2,
            manager_id: None,
            is_active: true,
            created_at: now,
        },
    ]
}

/// Fixture expenses filtered like the database query, newest first.
pub fn expenses(status_id: Option<i32>, user_id: Option<i32>) -> Vec<Expense> {
    let now = Utc::now();
    let mut list: Vec<Expense> = EXPENSES
        .iter()
        .filter_map(|&(id, category_id, status, amount_minor, (y, m, d), description)| {
            Some(Expense {
                id,
                user_id: 1,
                category_id,
                status_id: status.id(),
                amount_minor,
                currency: DEFAULT_CURRENCY.to_string(),
                expense_date: NaiveDate::from_ymd_opt(y, m, d)?,
                description: Some(description.to_string()),
                receipt_file: None,
                submitted_at: None,
                reviewed_by: None,
                reviewed_at: None,
                created_at: now,
                user_name: "Alice Example".to_string(),
                category_name: category_name(category_id),
                status_name: status.name().to_string(),
            })
        })
        .filter(|e| status_id.map_or(true, |s| e.status_id == s))
        .filter(|e| user_id.map_or(true, |u| e.user_id == u))
        .collect();
    list.sort_by(|a, b| b.expense_date.cmp(&a.expense_date));
    list
}

pub fn expense(id: i32) -> Option<Expense> {
    expenses(None, None).into_iter().find(|e| e.id == id)
}

pub fn user(id: i32) -> Option<User> {
    users().into_iter().find(|u| u.id == id)
}

fn category_name(id: i32) -> String {
    CATEGORIES
        .iter()
        .find(|(cid, _)| *cid == id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_expenses_newest_first() {
        let all = expenses(None, None);
        assert_eq!(all.len(), 4);
        let ids: Vec<i32> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 4, 3, 2]);
    }

    #[test]
    fn filters_by_status_and_user() {
        assert_eq!(expenses(Some(ExpenseStatus::Submitted.id()), None).len(), 2);
        assert_eq!(expenses(Some(ExpenseStatus::Draft.id()), None).len(), 0);
        assert_eq!(expenses(None, Some(1)).len(), 4);
        assert!(expenses(None, Some(2)).is_empty());
        assert_eq!(expenses(Some(ExpenseStatus::Approved.id()), Some(1)).len(), 1);
    }

    #[test]
    fn lookups_by_id() {
        assert_eq!(expense(3).map(|e| e.category_name), Some("Office Supplies".to_string()));
        assert!(expense(99).is_none());
        assert_eq!(user(2).map(|u| u.user_name), Some("Bob Manager".to_string()));
    }

    #[test]
    fn categories_are_all_active() {
        let cats = categories();
        assert_eq!(cats.len(), 4);
        assert!(cats.iter().all(|c| c.is_active));
    }
}
