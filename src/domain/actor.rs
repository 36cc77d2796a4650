use serde::{Deserialize, Serialize};

/// Capability level of whoever is calling into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Visitor,
    Contributor,
    Moderator,
}

impl Role {
    /// Resolve the role from authentication state and group membership.
    pub fn resolve<S: AsRef<str>>(authenticated: bool, groups: &[S], moderator_group: &str) -> Self {
        if !authenticated {
            return Role::Visitor;
        }
        if groups.iter().any(|g| g.as_ref() == moderator_group) {
            Role::Moderator
        } else {
            Role::Contributor
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Visitor => "Gość",
            Role::Contributor => "Użytkownik",
            Role::Moderator => "Redaktor",
        }
    }
}

/// The caller of a catalog operation, resolved once per request or job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn visitor() -> Self {
        Self {
            user_id: None,
            display_name: None,
            role: Role::Visitor,
        }
    }

    pub fn contributor(user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            display_name: Some(display_name.into()),
            role: Role::Contributor,
        }
    }

    pub fn moderator(user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            display_name: Some(display_name.into()),
            role: Role::Moderator,
        }
    }

    /// Build an authenticated actor from the user's group names.
    pub fn from_groups<S: AsRef<str>>(
        user_id: i64,
        display_name: impl Into<String>,
        groups: &[S],
        moderator_group: &str,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            display_name: Some(display_name.into()),
            role: Role::resolve(true, groups, moderator_group),
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Visitor && self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_resolution() {
        let none: [&str; 0] = [];
        assert_eq!(Role::resolve(false, &["Redaktor"], "Redaktor"), Role::Visitor);
        assert_eq!(Role::resolve(true, &none, "Redaktor"), Role::Contributor);
        assert_eq!(
            Role::resolve(true, &["Autorzy", "Redaktor"], "Redaktor"),
            Role::Moderator
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Role::Visitor.display_name(), "Gość");
        assert_eq!(Role::Contributor.display_name(), "Użytkownik");
        assert_eq!(Role::Moderator.display_name(), "Redaktor");
    }

    #[test]
    fn test_actor_from_groups() {
        let editor = Actor::from_groups(2, "editor", &["Redaktor".to_string()], "Redaktor");
        assert!(editor.is_moderator());
        assert!(editor.is_authenticated());

        let visitor = Actor::visitor();
        assert!(!visitor.is_authenticated());
    }
}
