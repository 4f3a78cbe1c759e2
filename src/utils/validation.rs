use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use super::datetime::{DATE_FORMAT, DATE_TIME_FORMAT, TIME_FORMAT};

pub const MIN_AGE: i64 = 5;
pub const MAX_AGE: i64 = 100;
const MAX_TIMEZONE_OFFSET: i32 = 12;

/// Why a piece of user input was refused. The `Display` text is what the
/// user sees in the re-prompt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The name must be at least 2 characters long.")]
    NameTooShort,
    #[error("The name cannot be longer than 100 characters.")]
    NameTooLong,
    #[error("Please enter your age as a number, for example 16.")]
    AgeNotNumber,
    #[error("Age must be between {MIN_AGE} and {MAX_AGE}.")]
    AgeOutOfRange,
    #[error("The timezone must look like MSK, MSK+2 or MSK-1.")]
    InvalidTimezone,
    #[error("The subject cannot be empty.")]
    EmptySubject,
    #[error("The text is too long (max {0} characters).")]
    TooLong(usize),
    #[error("The price must be a whole non-negative number.")]
    InvalidCost,
    #[error("Use the format YYYY-MM-DD HH:MM, for example 2024-09-01 16:30.")]
    InvalidDateTime,
    #[error("Use the format YYYY-MM-DD, for example 2024-09-01.")]
    InvalidDate,
    #[error("Use the format HH:MM, for example 16:30.")]
    InvalidTime,
    #[error("The end date cannot be before the start date.")]
    EndBeforeStart,
    #[error("That moment is already in the past.")]
    InPast,
    #[error("A Telegram user id is a positive number.")]
    InvalidUserId,
    #[error("The text cannot be empty.")]
    EmptyText,
    #[error("Please choose a tutor with the buttons above.")]
    TutorNotChosen,
}

pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    let len = name.chars().count();
    if len < 2 {
        return Err(ValidationError::NameTooShort);
    }
    if len > 100 {
        return Err(ValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

/// Non-numeric text and out-of-range numbers are reported differently.
pub fn validate_age(input: &str) -> Result<i64, ValidationError> {
    let age: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::AgeNotNumber)?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(ValidationError::AgeOutOfRange);
    }
    Ok(age)
}

/// Accepts `MSK`, `MSK+N` or `MSK-N` (Latin or Cyrillic letters, any case)
/// with `N` up to 12 and returns the normalized Latin spelling.
pub fn validate_timezone(input: &str) -> Result<String, ValidationError> {
    let upper = input.trim().to_uppercase();
    let rest = upper
        .strip_prefix("MSK")
        .or_else(|| upper.strip_prefix("МСК"))
        .ok_or(ValidationError::InvalidTimezone)?
        .trim();

    if rest.is_empty() {
        return Ok("MSK".to_string());
    }

    let (sign, digits) = match rest.chars().next() {
        Some('+') => ('+', &rest[1..]),
        Some('-') => ('-', &rest[1..]),
        _ => return Err(ValidationError::InvalidTimezone),
    };
    let digits = digits.trim();
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidTimezone);
    }
    let hours: i32 = digits.parse().map_err(|_| ValidationError::InvalidTimezone)?;
    if hours > MAX_TIMEZONE_OFFSET {
        return Err(ValidationError::InvalidTimezone);
    }
    if hours == 0 {
        return Ok("MSK".to_string());
    }
    Ok(format!("MSK{sign}{hours}"))
}

pub fn validate_subject(input: &str) -> Result<String, ValidationError> {
    validate_text(input, 100).map_err(|e| match e {
        ValidationError::EmptyText => ValidationError::EmptySubject,
        other => other,
    })
}

/// Trimmed, non-empty, at most `max` characters.
pub fn validate_text(input: &str, max: usize) -> Result<String, ValidationError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.chars().count() > max {
        return Err(ValidationError::TooLong(max));
    }
    Ok(text.to_string())
}

pub fn validate_cost(input: &str) -> Result<i64, ValidationError> {
    let cost: i64 = input.trim().parse().map_err(|_| ValidationError::InvalidCost)?;
    if cost < 0 {
        return Err(ValidationError::InvalidCost);
    }
    Ok(cost)
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate)
}

pub fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT).map_err(|_| ValidationError::InvalidTime)
}

/// `YYYY-MM-DD HH:MM`, tolerating repeated spaces between the parts.
pub fn parse_date_time(input: &str) -> Result<NaiveDateTime, ValidationError> {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, DATE_TIME_FORMAT)
        .map_err(|_| ValidationError::InvalidDateTime)
}

/// Like [`parse_date_time`] but refuses moments before `now`.
pub fn parse_future_date_time(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ValidationError> {
    let dt = parse_date_time(input)?;
    if dt < now {
        return Err(ValidationError::InPast);
    }
    Ok(dt)
}

pub fn validate_user_id(input: &str) -> Result<i64, ValidationError> {
    match input.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidUserId),
    }
}

/// `no`, `-` and empty input mean "leave this optional field empty".
pub fn optional_field(input: &str) -> Option<String> {
    let value = input.trim();
    match value.to_lowercase().as_str() {
        "" | "-" | "no" | "нет" => None,
        _ => Some(value.to_string()),
    }
}
