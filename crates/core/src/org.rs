//! Org-chart validation for employee records.
//!
//! Every employee except the top-level role reports to a supervisor, and
//! may additionally have a senior-staff first-line approver. The two must
//! be different people, and neither may be the employee themself.

use crate::error::CoreError;
use crate::roles::TOP_LEVEL_ROLE;
use crate::types::DbId;

/// The reporting fields of an employee record, as submitted.
#[derive(Debug, Clone, Copy)]
pub struct OrgFields<'a> {
    /// `None` when the record is being created.
    pub employee_id: Option<DbId>,
    pub role: &'a str,
    pub supervisor_id: Option<DbId>,
    pub senior_staff_id: Option<DbId>,
}

/// Validate the reporting chain of an employee record.
pub fn validate_org_fields(fields: &OrgFields<'_>) -> Result<(), CoreError> {
    if fields.supervisor_id.is_none() && fields.role != TOP_LEVEL_ROLE {
        return Err(CoreError::Validation(format!(
            "supervisor_id is required for role '{}'",
            fields.role
        )));
    }

    if let (Some(sup), Some(senior)) = (fields.supervisor_id, fields.senior_staff_id) {
        if sup == senior {
            return Err(CoreError::Validation(
                "supervisor_id and senior_staff_id must refer to different employees".to_string(),
            ));
        }
    }

    if let Some(id) = fields.employee_id {
        if fields.supervisor_id == Some(id) {
            return Err(CoreError::Validation(
                "An employee cannot be their own supervisor".to_string(),
            ));
        }
        if fields.senior_staff_id == Some(id) {
            return Err(CoreError::Validation(
                "An employee cannot be their own senior staff".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{ROLE_ADMIN, ROLE_STAFF, ROLE_SUPERVISOR};

    fn fields(
        employee_id: Option<DbId>,
        role: &str,
        supervisor_id: Option<DbId>,
        senior_staff_id: Option<DbId>,
    ) -> OrgFields<'_> {
        OrgFields {
            employee_id,
            role,
            supervisor_id,
            senior_staff_id,
        }
    }

    #[test]
    fn staff_with_supervisor_passes() {
        assert!(validate_org_fields(&fields(None, ROLE_STAFF, Some(2), None)).is_ok());
        assert!(validate_org_fields(&fields(Some(5), ROLE_STAFF, Some(2), Some(3))).is_ok());
    }

    #[test]
    fn missing_supervisor_rejected_below_top_level() {
        let err = validate_org_fields(&fields(None, ROLE_SUPERVISOR, None, None)).unwrap_err();
        assert!(err.to_string().contains("supervisor_id is required"));
    }

    #[test]
    fn top_level_role_needs_no_supervisor() {
        assert!(validate_org_fields(&fields(None, ROLE_ADMIN, None, None)).is_ok());
    }

    #[test]
    fn same_supervisor_and_senior_staff_rejected_for_every_role() {
        for role in crate::roles::VALID_ROLES {
            let result = validate_org_fields(&fields(Some(10), role, Some(4), Some(4)));
            assert!(result.is_err(), "role {role} accepted identical approvers");
        }
    }

    #[test]
    fn self_reference_rejected() {
        assert!(validate_org_fields(&fields(Some(7), ROLE_STAFF, Some(7), None)).is_err());
        assert!(validate_org_fields(&fields(Some(7), ROLE_STAFF, Some(2), Some(7))).is_err());
    }
}
