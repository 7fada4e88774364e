use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Delivery state of a reminder. Moves from `Pending` to one terminal state, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Sent,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Sent => "sent",
            Status::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub message: String,
    pub email: String,
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    pub status: Status,
}

impl Reminder {
    pub fn new(message: String, email: String, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            id: 0, // Will be set by storage
            message,
            email,
            date,
            time,
            status: Status::Pending,
        }
    }

    /// Local wall-clock instant the reminder is due
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.is_pending() && self.scheduled_at() <= now
    }
}

/// Raw compose form submission, exactly as typed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Draft {
    pub message: String,
    pub email: String,
    pub date: String,
    pub time: String,
}

/// Times are stored as `HH:MM`, matching what a time input produces.
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw)))
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
