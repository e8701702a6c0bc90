pub mod api;
pub mod approvals;
pub mod chat;
pub mod expenses;
