use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role tags stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Superadmin,
    Archived,
    Unregistered,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
            Role::Archived => "archived",
            Role::Unregistered => "unregistered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "🎓 Student",
            Role::Admin => "👨‍🏫 Tutor",
            Role::Superadmin => "👑 Superadmin",
            Role::Archived => "🗄 Archived",
            Role::Unregistered => "❔ Unregistered",
        }
    }

    /// Tutor workflows are open to admins and superadmins.
    pub fn is_tutor(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleParseError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("malformed role override '{0}', expected ID:PRIMARY[:ROLE,ROLE]")]
    MalformedOverride(String),
    #[error("invalid user id '{0}' in role override")]
    InvalidUserId(String),
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" | "tutor" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            "archived" => Ok(Role::Archived),
            "unregistered" => Ok(Role::Unregistered),
            other => Err(RoleParseError::UnknownRole(other.to_string())),
        }
    }
}

/// Primary menu role and switchable roles for one special user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOverride {
    pub primary: Role,
    pub roles: Vec<Role>,
}

/// Parse `ID:PRIMARY[:ROLE,ROLE...]` entries separated by `;`.
///
/// When the role list is omitted it defaults to the primary role alone.
pub fn parse_overrides(raw: &str) -> Result<HashMap<i64, RoleOverride>, RoleParseError> {
    let mut overrides = HashMap::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(RoleParseError::MalformedOverride(entry.to_string()));
        }

        let user_id: i64 = parts[0]
            .parse()
            .map_err(|_| RoleParseError::InvalidUserId(parts[0].to_string()))?;
        let primary: Role = parts[1].parse()?;

        let mut roles = match parts.get(2) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(Role::from_str)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        if !roles.contains(&primary) {
            roles.insert(0, primary);
        }

        overrides.insert(user_id, RoleOverride { primary, roles });
    }

    Ok(overrides)
}

/// Resolves which role a Telegram user acts under.
///
/// Built once from configuration and shared by all handlers. Lookups are
/// pure; the stored role from the database is passed in where it matters.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    superadmins: HashSet<i64>,
    overrides: HashMap<i64, RoleOverride>,
}

impl RoleResolver {
    pub fn new(
        superadmin_ids: impl IntoIterator<Item = i64>,
        overrides: HashMap<i64, RoleOverride>,
    ) -> Self {
        Self {
            superadmins: superadmin_ids.into_iter().collect(),
            overrides,
        }
    }

    /// Configured primary role, `Student` when the user has no override.
    pub fn primary_role(&self, user_id: i64) -> Role {
        self.overrides
            .get(&user_id)
            .map(|o| o.primary)
            .unwrap_or(Role::Student)
    }

    pub fn has_role(&self, user_id: i64, role: Role) -> bool {
        if role == Role::Superadmin && self.superadmins.contains(&user_id) {
            return true;
        }
        self.overrides
            .get(&user_id)
            .is_some_and(|o| o.roles.contains(&role))
    }

    /// Role whose menu the user should see.
    pub fn menu_role(&self, user_id: i64, stored: Role) -> Role {
        self.overrides
            .get(&user_id)
            .map(|o| o.primary)
            .unwrap_or(stored)
    }

    pub fn is_superadmin(&self, user_id: i64, stored: Option<Role>) -> bool {
        self.has_role(user_id, Role::Superadmin) || stored == Some(Role::Superadmin)
    }

    /// Whether `user_id` is in the configured superadmin list.
    pub fn is_configured_superadmin(&self, user_id: i64) -> bool {
        self.superadmins.contains(&user_id)
    }

    /// Roles a special user may switch between. Empty for everyone else.
    pub fn available_roles(&self, user_id: i64) -> &[Role] {
        self.overrides
            .get(&user_id)
            .map(|o| o.roles.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the user may switch to `role` with a menu command.
    pub fn can_switch_to(&self, user_id: i64, role: Role, stored: Option<Role>) -> bool {
        match role {
            Role::Superadmin => self.is_superadmin(user_id, stored),
            Role::Admin => {
                self.has_role(user_id, Role::Admin)
                    || self.is_superadmin(user_id, stored)
                    || stored == Some(Role::Admin)
            }
            Role::Student => true,
            Role::Archived | Role::Unregistered => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_override_with_role_list() {
        let parsed = parse_overrides("42:admin:admin,student,superadmin").unwrap();
        let o = &parsed[&42];
        assert_eq!(o.primary, Role::Admin);
        assert_eq!(o.roles, vec![Role::Admin, Role::Student, Role::Superadmin]);
    }

    #[test]
    fn primary_is_added_to_role_list() {
        let parsed = parse_overrides("7:superadmin:student").unwrap();
        assert_eq!(parsed[&7].roles, vec![Role::Superadmin, Role::Student]);
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(matches!(
            parse_overrides("nope"),
            Err(RoleParseError::MalformedOverride(_))
        ));
        assert!(matches!(
            parse_overrides("abc:admin"),
            Err(RoleParseError::InvalidUserId(_))
        ));
        assert!(matches!(
            parse_overrides("1:wizard"),
            Err(RoleParseError::UnknownRole(_))
        ));
    }

    #[test]
    fn empty_override_text_is_empty_map() {
        assert!(parse_overrides("  ").unwrap().is_empty());
        assert!(parse_overrides(";;").unwrap().is_empty());
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [
            Role::Student,
            Role::Admin,
            Role::Superadmin,
            Role::Archived,
            Role::Unregistered,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("Tutor".parse::<Role>().unwrap(), Role::Admin);
    }
}
