//! Repository layer: one zero-sized struct per table with async query methods.

pub mod employee_repo;
pub mod expense_report_repo;
pub mod mileage_entry_repo;
pub mod notification_repo;
pub mod receipt_repo;
pub mod time_entry_repo;

pub use employee_repo::EmployeeRepo;
pub use expense_report_repo::ExpenseReportRepo;
pub use mileage_entry_repo::MileageEntryRepo;
pub use notification_repo::NotificationRepo;
pub use receipt_repo::ReceiptRepo;
pub use time_entry_repo::TimeEntryRepo;
