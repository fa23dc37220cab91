//! Static cost-center catalogue.
//!
//! The mobile client ships the same list as an offline fallback, so codes
//! here are append-only.

use serde::Serialize;

use crate::error::CoreError;

/// A single chargeable cost center.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CostCenter {
    pub code: &'static str,
    pub name: &'static str,
}

pub const COST_CENTERS: &[CostCenter] = &[
    CostCenter { code: "ADMIN", name: "Administration" },
    CostCenter { code: "FIELD", name: "Field Operations" },
    CostCenter { code: "OUTREACH", name: "Community Outreach" },
    CostCenter { code: "TRAINING", name: "Training & Development" },
    CostCenter { code: "GRANTS", name: "Grant Programs" },
    CostCenter { code: "FACILITIES", name: "Facilities" },
    CostCenter { code: "IT", name: "Information Technology" },
];

/// Look up a cost center by its code.
pub fn find(code: &str) -> Option<&'static CostCenter> {
    COST_CENTERS.iter().find(|c| c.code == code)
}

/// Validate a single cost-center code.
pub fn validate_cost_center(code: &str) -> Result<(), CoreError> {
    if find(code).is_some() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Unknown cost center '{code}'")))
    }
}

/// Validate a list of cost-center codes, rejecting duplicates.
pub fn validate_cost_centers(codes: &[String]) -> Result<(), CoreError> {
    for (i, code) in codes.iter().enumerate() {
        validate_cost_center(code)?;
        if codes[..i].contains(code) {
            return Err(CoreError::Validation(format!(
                "Cost center '{code}' listed more than once"
            )));
        }
    }
    Ok(())
}
