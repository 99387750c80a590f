//! Resolved caller identity and the role capability check
use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }
}

/// A caller identity the external auth collaborator has already resolved.
/// The engine never sees transport-level credentials, only this pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Boundary helper for collaborators that carry identity as raw strings,
    /// e.g. `x-user-id` / `x-role` headers. A missing piece or an unknown
    /// role name means no actor was resolved.
    pub fn resolve(user_id: Option<&str>, role: Option<&str>) -> Result<Self, WorkflowError> {
        let (user_id, role) = match (user_id, role) {
            (Some(u), Some(r)) if !u.is_empty() => (u, r),
            _ => return Err(WorkflowError::AuthenticationRequired),
        };
        let role = match role {
            "customer" => Role::Customer,
            "provider" => Role::Provider,
            "admin" => Role::Admin,
            _ => return Err(WorkflowError::AuthenticationRequired),
        };
        Ok(Actor::new(user_id, role))
    }
}

/// Uniform capability check applied at the top of every operation.
pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), WorkflowError> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    let wanted = allowed
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(WorkflowError::AuthorizationDenied(format!(
        "requires role {wanted}, actor has {}",
        actor.role.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_requires_both_parts() {
        assert!(matches!(
            Actor::resolve(None, Some("customer")),
            Err(WorkflowError::AuthenticationRequired)
        ));
        assert!(matches!(
            Actor::resolve(Some("user_1"), None),
            Err(WorkflowError::AuthenticationRequired)
        ));
        assert!(matches!(
            Actor::resolve(Some("user_1"), Some("superuser")),
            Err(WorkflowError::AuthenticationRequired)
        ));
    }

    #[test]
    fn resolve_accepts_known_roles() {
        let actor = Actor::resolve(Some("user_1"), Some("provider")).unwrap();
        assert_eq!(actor.role, Role::Provider);
        assert_eq!(actor.user_id, "user_1");
    }

    #[test]
    fn role_check_rejects_wrong_role() {
        let actor = Actor::new("user_1", Role::Provider);
        assert!(require_role(&actor, &[Role::Customer]).is_err());
        assert!(require_role(&actor, &[Role::Provider, Role::Admin]).is_ok());
    }
}
