use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StudySessionStatus {
    Running,
    Completed,
    Cancelled,
    Interrupted,
}

impl StudySessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudySessionStatus::Running => "Running",
            StudySessionStatus::Completed => "Completed",
            StudySessionStatus::Cancelled => "Cancelled",
            StudySessionStatus::Interrupted => "Interrupted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySession {
    pub id: String,
    pub topic: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: StudySessionStatus,
}

impl StudySession {
    pub fn begin(topic: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic,
            started_at,
            ended_at: None,
            status: StudySessionStatus::Running,
        }
    }

    /// Whole minutes between the session start and `now`.
    pub fn minutes_elapsed(&self, now: DateTime<Utc>) -> u32 {
        let minutes = (now - self.started_at).num_minutes().max(0);
        u32::try_from(minutes).unwrap_or(u32::MAX)
    }
}
