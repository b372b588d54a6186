use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FieldAgent,
    LoanOfficer,
    BranchManager,
    Admin,
}

impl Role {
    /// Agent-id prefix enforced for accounts of this role.
    pub fn agent_prefix(&self) -> &'static str {
        match self {
            Role::FieldAgent => "FA",
            Role::LoanOfficer => "LO",
            Role::BranchManager => "BM",
            Role::Admin => "ADM",
        }
    }

    /// Admin accounts are organization-wide; everyone else belongs to a branch.
    pub fn requires_branch(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

/// Permission flags. Always derived from role, never stored or settable
/// independently, so a role change can never leave stale flags behind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    pub can_submit: bool,
    pub can_review: bool,
    pub can_approve: bool,
    pub can_manage_users: bool,
    pub can_generate_profiles: bool,
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::FieldAgent => Permissions {
                can_submit: true,
                can_review: false,
                can_approve: false,
                can_manage_users: false,
                can_generate_profiles: false,
            },
            Role::LoanOfficer => Permissions {
                can_submit: true,
                can_review: true,
                can_approve: false,
                can_manage_users: false,
                can_generate_profiles: true,
            },
            Role::BranchManager => Permissions {
                can_submit: true,
                can_review: true,
                can_approve: true,
                can_manage_users: false,
                can_generate_profiles: true,
            },
            Role::Admin => Permissions {
                can_submit: true,
                can_review: true,
                can_approve: true,
                can_manage_users: true,
                can_generate_profiles: true,
            },
        }
    }
}

/// Checks an agent id against the role's required shape: role prefix followed
/// by at least three digits, e.g. `FA012` or `ADM001`.
pub fn agent_id_matches_role(agent_id: &str, role: Role) -> bool {
    let prefix = role.agent_prefix();
    match agent_id.strip_prefix(prefix) {
        Some(digits) => digits.len() >= 3 && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub agent_id: String,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub branch: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn permissions(&self) -> Permissions {
        Permissions::for_role(self.role)
    }

    /// The serializable view of a user. The password hash never leaves the
    /// server; permissions are recomputed from the role on every read.
    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id,
            agent_id: self.agent_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            branch: self.branch.clone(),
            is_active: self.is_active,
            permissions: self.permissions(),
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub agent_id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub branch: Option<String>,
    pub is_active: bool,
    pub permissions: Permissions,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_agent_cannot_review() {
        let perms = Permissions::for_role(Role::FieldAgent);
        assert!(perms.can_submit);
        assert!(!perms.can_review);
        assert!(!perms.can_approve);
        assert!(!perms.can_manage_users);
    }

    #[test]
    fn test_only_admin_manages_users() {
        for role in [Role::FieldAgent, Role::LoanOfficer, Role::BranchManager] {
            assert!(!Permissions::for_role(role).can_manage_users);
        }
        assert!(Permissions::for_role(Role::Admin).can_manage_users);
    }

    #[test]
    fn test_branch_manager_can_approve_loan_officer_cannot() {
        assert!(Permissions::for_role(Role::BranchManager).can_approve);
        assert!(!Permissions::for_role(Role::LoanOfficer).can_approve);
    }

    #[test]
    fn test_agent_id_pattern_per_role() {
        assert!(agent_id_matches_role("FA012", Role::FieldAgent));
        assert!(agent_id_matches_role("LO104", Role::LoanOfficer));
        assert!(agent_id_matches_role("BM007", Role::BranchManager));
        assert!(agent_id_matches_role("ADM001", Role::Admin));

        // Wrong prefix for the role
        assert!(!agent_id_matches_role("FA012", Role::Admin));
        assert!(!agent_id_matches_role("ADM001", Role::FieldAgent));
        // Too few digits, or non-digits after the prefix
        assert!(!agent_id_matches_role("FA12", Role::FieldAgent));
        assert!(!agent_id_matches_role("FA01X", Role::FieldAgent));
        assert!(!agent_id_matches_role("", Role::FieldAgent));
    }

    #[test]
    fn test_branch_required_except_admin() {
        assert!(Role::FieldAgent.requires_branch());
        assert!(Role::LoanOfficer.requires_branch());
        assert!(Role::BranchManager.requires_branch());
        assert!(!Role::Admin.requires_branch());
    }
}
