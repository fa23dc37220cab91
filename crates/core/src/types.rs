/// Primary keys are BIGSERIAL.
pub type DbId = i64;

/// Stored as TIMESTAMPTZ, always handled in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Money amounts (receipts, reimbursements) in integer cents.
pub type Cents = i64;
