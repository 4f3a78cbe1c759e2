use tracing::{debug, error, info, warn};

/// Logs handler start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_START: {} by {}({}) - {}", command, user, user_id, d),
        None => info!("CMD_START: {} by {}({})", command, user, user_id),
    }
}

/// Logs handler completion with consistent format
pub fn log_command_success(command: &str, user: &str, user_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_SUCCESS: {} by {}({}) - {}", command, user, user_id, d),
        None => info!("CMD_SUCCESS: {} by {}({})", command, user, user_id),
    }
}

pub fn log_command_error(command: &str, user: &str, user_id: i64, error: &str) {
    error!("CMD_ERROR: {} by {}({}) - {}", command, user, user_id, error);
}

pub fn log_validation_error(step: &str, value: &str, error: &str, user_id: i64) {
    warn!(
        "VALIDATION_ERROR: {} value '{}' rejected: {} - user {}",
        step, value, error, user_id
    );
}

pub fn log_permission_denied(action: &str, user_id: i64) {
    warn!("PERMISSION_DENIED: {} by user {}", action, user_id);
}

pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    match details {
        Some(d) => error!("DB_ERROR: {} on {} failed: {} - {}", operation, table, error, d),
        None => error!("DB_ERROR: {} on {} failed: {}", operation, table, error),
    }
}

pub fn log_notification_failure(kind: &str, recipient: i64, error: &str) {
    error!("NOTIFY_ERROR: {} to {} failed: {}", kind, recipient, error);
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
