//! Admin directory: users, staff, categories, plus the public lookups and
//! the audit read.

use serde::Deserialize;
use tracing::info;

use helpdesk_shared::{Actor, AuditAction, StaffRole};
use helpdesk_store::{AuditEntry, Lookup, Staff, User};

use super::{require_admin, require_category, Desk};
use crate::error::{Conflict, DeskError};

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub user_id: i64,
    pub field_id: i64,
    #[serde(default = "default_staff_role")]
    pub role: StaffRole,
}

fn default_staff_role() -> StaffRole {
    StaffRole::Staff
}

impl Desk {
    pub fn create_user(
        &self,
        actor: &Actor,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, DeskError> {
        require_admin(actor)?;
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DeskError::validation("email is not valid"));
        }
        if self.db.find_user_by_email(&email)?.is_some() {
            return Err(Conflict::Duplicate.into());
        }

        let user = self.db.create_user(&email, display_name.map(str::trim))?;
        self.audit(
            AuditAction::Create,
            Some(actor.user_id),
            &format!("user {} created", user.id),
        );
        Ok(user)
    }

    pub fn list_staff(&self, actor: &Actor) -> Result<Vec<Staff>, DeskError> {
        require_admin(actor)?;
        Ok(self.db.list_staff()?)
    }

    /// Promote an existing user to staff in one field.
    pub fn create_staff(&self, actor: &Actor, req: NewStaff) -> Result<Staff, DeskError> {
        require_admin(actor)?;

        let staff = self.db.immediate(|db| {
            let user = db.get_user(req.user_id).map_err(DeskError::missing("user"))?;
            require_category(db, req.field_id)?;
            if db.find_staff_by_user(user.id)?.is_some() {
                return Err(DeskError::from(Conflict::Duplicate));
            }
            Ok(db.create_staff(user.id, &user.email, req.field_id, req.role)?)
        })?;

        info!(staff_id = staff.id, field_id = staff.field_id, "Staff member added");
        self.audit(
            AuditAction::Create,
            Some(actor.user_id),
            &format!("staff {} created for user {} in category {}", staff.id, staff.user_id, staff.field_id),
        );
        Ok(staff)
    }

    /// Activate or deactivate a staff member. Their current tickets stay
    /// with them; only new assignments are affected.
    pub fn set_staff_active(&self, actor: &Actor, staff_id: i64, active: bool) -> Result<Staff, DeskError> {
        require_admin(actor)?;
        self.db.get_staff(staff_id).map_err(DeskError::missing("staff"))?;
        if !self.db.set_staff_active(staff_id, active)? {
            return Err(Conflict::NoChange.into());
        }

        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!(
                "staff {staff_id} {}",
                if active { "activated" } else { "deactivated" }
            ),
        );
        self.db.get_staff(staff_id).map_err(DeskError::missing("staff"))
    }

    pub fn create_category(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
    ) -> Result<Lookup, DeskError> {
        require_admin(actor)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DeskError::validation("category name must not be empty"));
        }

        let category = self.db.create_category(name, description)?;
        self.audit(
            AuditAction::Create,
            Some(actor.user_id),
            &format!("category {} \"{}\" created", category.id, category.name),
        );
        Ok(category)
    }

    pub fn categories(&self) -> Result<Vec<Lookup>, DeskError> {
        Ok(self.db.list_categories()?)
    }

    pub fn priorities(&self) -> Result<Vec<Lookup>, DeskError> {
        Ok(self.db.list_priorities()?)
    }

    pub fn statuses(&self) -> Result<Vec<Lookup>, DeskError> {
        Ok(self.db.list_statuses()?)
    }

    pub fn audit_log(&self, actor: &Actor, limit: u32) -> Result<Vec<AuditEntry>, DeskError> {
        require_admin(actor)?;
        Ok(self.db.list_audit(limit)?)
    }
}

#[cfg(test)]
mod tests {
    use helpdesk_shared::StaffRole;

    use super::NewStaff;
    use crate::desk::testkit::fixture;
    use crate::error::{Conflict, DeskError};

    #[test]
    fn admin_onboards_a_staff_member() {
        let fx = fixture();
        let admin = fx.admin("admin@example.com");

        let user = fx.desk.create_user(&admin, " Agent@Example.com ", Some("Agent")).unwrap();
        assert_eq!(user.email, "agent@example.com");
        assert!(matches!(
            fx.desk.create_user(&admin, "agent@example.com", None),
            Err(DeskError::Conflict(Conflict::Duplicate))
        ));

        let staff = fx
            .desk
            .create_staff(
                &admin,
                NewStaff {
                    user_id: user.id,
                    field_id: 3,
                    role: StaffRole::Staff,
                },
            )
            .unwrap();
        assert_eq!(staff.email, "agent@example.com");
        assert!(staff.is_active);

        assert!(matches!(
            fx.desk.create_staff(
                &admin,
                NewStaff {
                    user_id: user.id,
                    field_id: 3,
                    role: StaffRole::Staff,
                }
            ),
            Err(DeskError::Conflict(Conflict::Duplicate))
        ));
        assert!(matches!(
            fx.desk.create_staff(
                &admin,
                NewStaff {
                    user_id: 999,
                    field_id: 3,
                    role: StaffRole::Staff,
                }
            ),
            Err(DeskError::NotFound("user"))
        ));

        let other = fx.desk.create_user(&admin, "other@example.com", None).unwrap();
        assert!(matches!(
            fx.desk.create_staff(
                &admin,
                NewStaff {
                    user_id: other.id,
                    field_id: 77,
                    role: StaffRole::Staff,
                }
            ),
            Err(DeskError::Validation(_))
        ));
    }

    #[test]
    fn deactivation_toggles_once() {
        let fx = fixture();
        let admin = fx.admin("admin@example.com");
        let staff = fx.staff("s@example.com", 2);
        let id = staff.staff_id.unwrap();

        assert!(!fx.desk.set_staff_active(&admin, id, false).unwrap().is_active);
        assert!(matches!(
            fx.desk.set_staff_active(&admin, id, false),
            Err(DeskError::Conflict(Conflict::NoChange))
        ));
        assert!(fx.desk.set_staff_active(&admin, id, true).unwrap().is_active);
        assert!(matches!(
            fx.desk.set_staff_active(&admin, 999, true),
            Err(DeskError::NotFound("staff"))
        ));
    }

    #[test]
    fn directory_is_admin_only() {
        let fx = fixture();
        let staff = fx.staff("s@example.com", 2);
        let customer = fx.customer("c@example.com");

        assert!(matches!(fx.desk.list_staff(&staff), Err(DeskError::Forbidden(_))));
        assert!(matches!(
            fx.desk.create_category(&customer, "Hardware", None),
            Err(DeskError::Forbidden(_))
        ));
        assert!(matches!(fx.desk.audit_log(&staff, 10), Err(DeskError::Forbidden(_))));
    }

    #[test]
    fn categories_are_unique() {
        let fx = fixture();
        let admin = fx.admin("admin@example.com");

        let before = fx.desk.categories().unwrap().len();
        fx.desk.create_category(&admin, "Hardware", Some("Devices")).unwrap();
        assert_eq!(fx.desk.categories().unwrap().len(), before + 1);
        assert!(matches!(
            fx.desk.create_category(&admin, "Hardware", None),
            Err(DeskError::Conflict(Conflict::Duplicate))
        ));
        assert!(matches!(
            fx.desk.create_category(&admin, "  ", None),
            Err(DeskError::Validation(_))
        ));
        assert_eq!(fx.desk.priorities().unwrap().len(), 3);
        assert_eq!(fx.desk.statuses().unwrap().len(), 4);
    }
}
