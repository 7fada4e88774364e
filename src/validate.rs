use crate::error::{AppError, AppResult};
use crate::reminder::{parse_date, parse_time, Draft, Reminder};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `local@domain.tld`: one `@`, no whitespace, a dot somewhere after the `@`
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub fn validate_required(message: &str, email: &str, date: &str, time: &str) -> AppResult<()> {
    if [message, email, date, time].iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::MissingField);
    }
    Ok(())
}

pub fn validate_email_shape(email: &str) -> AppResult<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::InvalidEmail)
    }
}

pub fn validate_future(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> AppResult<()> {
    if date.and_time(time) > now {
        Ok(())
    } else {
        Err(AppError::NotFuture)
    }
}

/// Run every check in order and build the reminder the form describes.
/// Only the first failure is reported.
pub fn validate_draft(draft: &Draft, now: NaiveDateTime) -> AppResult<Reminder> {
    let message = draft.message.trim();
    let email = draft.email.trim();
    validate_required(message, email, &draft.date, &draft.time)?;

    // An unreadable date or time is as good as an empty one
    let date = parse_date(&draft.date).ok_or(AppError::MissingField)?;
    let time = parse_time(&draft.time).ok_or(AppError::MissingField)?;

    validate_email_shape(email)?;
    validate_future(date, time, now)?;

    Ok(Reminder::new(message.to_string(), email.to_string(), date, time))
}
