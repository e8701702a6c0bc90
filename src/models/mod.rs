pub mod expense;
pub mod user;

pub use expense::{
    apply_text_filter, CreateExpenseRequest, Expense, ExpenseCategory, ExpenseResponse,
    ExpenseStatus, UpdateExpenseStatusRequest, DEFAULT_CURRENCY,
};
pub use user::User;
