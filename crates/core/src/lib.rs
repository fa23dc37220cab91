//! Domain types and pure business rules for the mileage & expense backend.
//!
//! Nothing in this crate touches the database or the network. The DB and
//! API layers call into these modules for validation and for every
//! approval-workflow transition.

pub mod cost_centers;
pub mod entries;
pub mod error;
pub mod escalation;
pub mod mileage;
pub mod org;
pub mod pagination;
pub mod roles;
pub mod types;
pub mod workflow;
