#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use teloxide::types::InlineKeyboardMarkup;
use tempfile::{tempdir, TempDir};
use tutor_bot::bot::context::AppContext;
use tutor_bot::database::connection::DatabaseManager;
use tutor_bot::database::models::*;
use tutor_bot::services::notifications::{NotificationService, Notifier};
use tutor_bot::services::roles::{Role, RoleResolver};

pub async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

/// One outgoing message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub user_id: i64,
    pub text: String,
    pub media: Option<ContentType>,
    pub has_keyboard: bool,
}

/// Records every send attempt instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failing: bool,
}

impl RecordingNotifier {
    /// Every send is recorded but reported as failed.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: i64) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, user_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> bool {
        self.sent.lock().unwrap().push(Sent {
            user_id,
            text: text.to_string(),
            media: None,
            has_keyboard: keyboard.is_some(),
        });
        !self.failing
    }

    async fn send_media(
        &self,
        user_id: i64,
        content_type: ContentType,
        file_id: &str,
        caption: Option<&str>,
    ) -> bool {
        self.sent.lock().unwrap().push(Sent {
            user_id,
            text: caption.unwrap_or(file_id).to_string(),
            media: Some(content_type),
            has_keyboard: false,
        });
        !self.failing
    }
}

/// A migrated database plus a context whose notifications are recorded.
pub struct TestEnv {
    pub ctx: AppContext,
    pub notifier: Arc<RecordingNotifier>,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub fn db(&self) -> &DatabaseManager {
        &self.ctx.db
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.ctx.notifications
    }
}

pub async fn setup_env() -> Result<TestEnv> {
    setup_env_with(RecordingNotifier::default(), Vec::new()).await
}

pub async fn setup_env_with(notifier: RecordingNotifier, superadmins: Vec<i64>) -> Result<TestEnv> {
    let (db, temp_dir) = setup_test_db().await?;
    let notifier = Arc::new(notifier);
    let notifications = NotificationService::new(notifier.clone());
    let roles = Arc::new(RoleResolver::new(superadmins, HashMap::new()));

    Ok(TestEnv {
        ctx: AppContext::new(db, roles, notifications, 3),
        notifier,
        _temp_dir: temp_dir,
    })
}

/// A tutor account with a profile.
pub async fn seed_tutor(db: &DatabaseManager, id: i64, name: &str) -> Result<Tutor> {
    let mut conn = db.pool.acquire().await?;
    User::upsert_with_role(&mut conn, id, None, name, Role::Admin).await?;
    let tutor = Tutor::upsert(
        &mut conn,
        &NewTutor {
            id,
            name: name.to_string(),
            username: None,
            subjects: "Math, Physics".to_string(),
            cost: 1500,
            link: Some("https://meet.example.com/room".to_string()),
        },
    )
    .await?;
    Ok(tutor)
}

/// A student whose request to the tutor was accepted.
pub async fn seed_student(db: &DatabaseManager, id: i64, tutor_id: i64, name: &str) -> Result<User> {
    let mut conn = db.pool.acquire().await?;
    let user = User::upsert_student(
        &mut conn,
        &NewStudent {
            id,
            username: Some(format!("student{id}")),
            name: name.to_string(),
            tutor_id,
            timezone: "MSK".to_string(),
            subject: "Math".to_string(),
            age: 16,
        },
    )
    .await?;
    let request = StudentRequest::create(&mut conn, id, tutor_id).await?;
    StudentRequest::decide(&mut *conn, request.id, RequestStatus::Accepted).await?;
    Ok(user)
}
