use std::sync::Arc;

use crate::database::connection::DatabaseManager;
use crate::database::models::User;
use crate::services::notifications::NotificationService;
use crate::services::roles::{Role, RoleResolver};
use crate::utils::datetime;

/// Shared handles every handler needs.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseManager,
    pub roles: Arc<RoleResolver>,
    pub notifications: NotificationService,
    pub utc_offset_hours: i32,
}

impl AppContext {
    pub fn new(
        db: DatabaseManager,
        roles: Arc<RoleResolver>,
        notifications: NotificationService,
        utc_offset_hours: i32,
    ) -> Self {
        Self {
            db,
            roles,
            notifications,
            utc_offset_hours,
        }
    }

    pub fn today(&self) -> String {
        datetime::format_date(datetime::today(self.utc_offset_hours))
    }

    pub fn now(&self) -> chrono::NaiveDateTime {
        datetime::local_now(self.utc_offset_hours)
    }

    /// Menu role for a user, taking special-user overrides into account.
    pub fn menu_role(&self, user_id: i64, user: Option<&User>) -> Role {
        let stored = user.map(User::role).unwrap_or(Role::Unregistered);
        let role = self.roles.menu_role(user_id, stored);
        if role == Role::Unregistered && self.roles.is_configured_superadmin(user_id) {
            return Role::Superadmin;
        }
        role
    }

    pub async fn load_user(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        User::find_by_id(&self.db.pool, user_id).await
    }

    /// Whether the user may use tutor features.
    pub fn can_tutor(&self, user_id: i64, user: Option<&User>) -> bool {
        let stored = user.map(User::role);
        stored.is_some_and(|r| r.is_tutor())
            || self.roles.has_role(user_id, Role::Admin)
            || self.roles.is_superadmin(user_id, stored)
    }

    pub fn is_superadmin(&self, user_id: i64, user: Option<&User>) -> bool {
        self.roles.is_superadmin(user_id, user.map(User::role))
    }
}
