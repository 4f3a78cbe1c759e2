use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::env;

use crate::services::roles::{parse_overrides, RoleOverride};

/// Database used when `DATABASE_URL` is unset or blank.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/tutor_bot.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Users that always get superadmin rights.
    pub superadmin_ids: Vec<i64>,
    /// Special users with a fixed menu role and switchable roles.
    pub special_users: HashMap<i64, RoleOverride>,
    pub reminder_interval_minutes: u32,
    /// Offset from UTC that lesson dates and times are written in.
    pub utc_offset_hours: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let port_str = env::var("HTTP_PORT").unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let superadmin_ids = parse_id_list(&env::var("SUPERADMIN_IDS").unwrap_or_default())?;

        let special_users = parse_overrides(&env::var("SPECIAL_USERS").unwrap_or_default())
            .map_err(|e| anyhow!("Invalid SPECIAL_USERS: {}", e))?;

        let reminder_interval_minutes: u32 = env::var("REMINDER_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid REMINDER_INTERVAL_MINUTES"))?;
        // The cron step restarts every hour, so only divisors of 60 give even spacing.
        if !(1..60).contains(&reminder_interval_minutes) || 60 % reminder_interval_minutes != 0 {
            return Err(anyhow!(
                "REMINDER_INTERVAL_MINUTES must divide 60 (1, 2, 3, 4, 5, 6, 10, 12, 15, 20 or 30)"
            ));
        }

        let utc_offset_hours: i32 = env::var("UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| "3".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid UTC_OFFSET_HOURS"))?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(anyhow!("UTC_OFFSET_HOURS must be between -12 and 14"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            superadmin_ids,
            special_users,
            reminder_interval_minutes,
            utc_offset_hours,
        })
    }
}

/// `DATABASE_URL`, or the default SQLite file. Needs no bot token.
pub fn database_url_from_env() -> String {
    env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| anyhow!("Invalid user id '{}' in SUPERADMIN_IDS", s))
        })
        .collect()
}
