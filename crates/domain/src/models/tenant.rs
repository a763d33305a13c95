//! Tenant and principal models.
//!
//! A tenant is a company account and its workspaces. Every settings lookup
//! receives a [`TenantContext`] describing who is asking and in which
//! operating mode the application runs.

use serde::{Deserialize, Serialize};

/// Account type of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Company,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Company => "company",
            UserRole::Member => "member",
        }
    }

    /// Parses the stored account type. Anything that is not a super admin or a
    /// company account is a member of some company.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "super_admin" | "super admin" | "superadmin" => UserRole::SuperAdmin,
            "company" => UserRole::Company,
            _ => UserRole::Member,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Owning company for members; `None` for top-level accounts.
    pub created_by: Option<i64>,
    pub current_workspace_id: Option<i64>,
    pub lang: Option<String>,
}

impl User {
    /// Id of the account whose settings apply to this user.
    ///
    /// Super admins and companies own their settings. Members read their
    /// company's settings; a member without an owner falls back to itself.
    pub fn owner_id(&self) -> i64 {
        match self.role {
            UserRole::SuperAdmin | UserRole::Company => self.id,
            UserRole::Member => self.created_by.unwrap_or(self.id),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }
}

/// Operating mode of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantMode {
    /// Multi-tenant: every company has its own scope.
    #[default]
    Saas,
    /// One company account owns everything.
    SingleTenant,
}

/// Ambient request state passed explicitly to every resolver call.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    pub principal: Option<User>,
    pub mode: TenantMode,
    /// Installation or update in progress; storage must not be touched.
    pub bootstrapping: bool,
}

impl TenantContext {
    pub fn anonymous(mode: TenantMode) -> Self {
        Self {
            principal: None,
            mode,
            bootstrapping: false,
        }
    }

    pub fn authenticated(principal: User, mode: TenantMode) -> Self {
        Self {
            principal: Some(principal),
            mode,
            bootstrapping: false,
        }
    }

    pub fn bootstrapping(mode: TenantMode) -> Self {
        Self {
            principal: None,
            mode,
            bootstrapping: true,
        }
    }

    pub fn is_single_tenant(&self) -> bool {
        self.mode == TenantMode::SingleTenant
    }
}

/// Explicit ids supplied by a caller. Omitted ids are inferred from the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequest {
    pub user_id: Option<i64>,
    pub workspace_id: Option<i64>,
}

impl ScopeRequest {
    pub fn inferred() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            workspace_id: None,
        }
    }

    pub fn with_workspace(mut self, workspace_id: i64) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }
}

/// Storage scope a request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedScope {
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    /// Tenant-wide rows are merged under the workspace rows.
    pub merge_tenant_wide: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole, created_by: Option<i64>) -> User {
        User {
            id,
            name: format!("user{}", id),
            email: format!("user{}@taskly.test", id),
            role,
            created_by,
            current_workspace_id: None,
            lang: None,
        }
    }

    #[test]
    fn test_owner_id_by_role() {
        assert_eq!(user(1, UserRole::SuperAdmin, None).owner_id(), 1);
        assert_eq!(user(2, UserRole::Company, Some(1)).owner_id(), 2);
        assert_eq!(user(3, UserRole::Member, Some(2)).owner_id(), 2);
        assert_eq!(user(4, UserRole::Member, None).owner_id(), 4);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("super admin"), UserRole::SuperAdmin);
        assert_eq!(UserRole::parse("super_admin"), UserRole::SuperAdmin);
        assert_eq!(UserRole::parse("Company"), UserRole::Company);
        assert_eq!(UserRole::parse("client"), UserRole::Member);
        assert_eq!(UserRole::Company.to_string(), "company");
    }

    #[test]
    fn test_scope_request_builders() {
        let scope = ScopeRequest::for_user(5).with_workspace(9);
        assert_eq!(scope.user_id, Some(5));
        assert_eq!(scope.workspace_id, Some(9));
        assert_eq!(ScopeRequest::inferred(), ScopeRequest::default());
    }

    #[test]
    fn test_context_constructors() {
        let ctx = TenantContext::bootstrapping(TenantMode::Saas);
        assert!(ctx.bootstrapping);
        assert!(ctx.principal.is_none());

        let ctx = TenantContext::anonymous(TenantMode::SingleTenant);
        assert!(ctx.is_single_tenant());
        assert!(!ctx.bootstrapping);
    }
}
