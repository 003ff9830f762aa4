use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::{db::models::StudySessionStatus, emotion::EmotionLabel};

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<StudySessionStatus> {
    match value {
        "Running" => Ok(StudySessionStatus::Running),
        "Completed" => Ok(StudySessionStatus::Completed),
        "Cancelled" => Ok(StudySessionStatus::Cancelled),
        "Interrupted" => Ok(StudySessionStatus::Interrupted),
        other => Err(anyhow!("unknown session status {other}")),
    }
}

pub fn parse_emotion(value: &str, field: &str) -> Result<EmotionLabel> {
    value
        .parse()
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_emotion(value: Option<String>, field: &str) -> Result<Option<EmotionLabel>> {
    value.map(|raw| parse_emotion(&raw, field)).transpose()
}
