pub mod access;
pub mod auth;
pub mod cost_centers;
pub mod employees;
pub mod expense_reports;
pub mod mileage;
pub mod notifications;
pub mod receipts;
pub mod time_entries;
