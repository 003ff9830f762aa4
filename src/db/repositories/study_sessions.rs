use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status},
    models::{StudySession, StudySessionStatus},
};

fn row_to_study_session(row: &Row) -> Result<StudySession> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;

    Ok(StudySession {
        id: row.get("id")?,
        topic: row.get("topic")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        status: parse_status(&status)?,
    })
}

impl Database {
    pub async fn insert_study_session(&self, session: &StudySession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO study_sessions (id, topic, started_at, ended_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.topic,
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_session_status(
        &self,
        session_id: &str,
        status: StudySessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE study_sessions
                 SET status = ?1,
                     ended_at = ?2
                 WHERE id = ?3",
                params![
                    status.as_str(),
                    ended_at.map(|dt| dt.to_rfc3339()),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_study_session(&self, session_id: &str) -> Result<Option<StudySession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, topic, started_at, ended_at, status
                 FROM study_sessions
                 WHERE id = ?1",
            )?;

            let session = stmt
                .query_row(params![session_id], |row| Ok(row_to_study_session(row)))
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    /// Most recent session still marked running, typically left behind by a crash.
    pub async fn get_incomplete_session(&self) -> Result<Option<StudySession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, topic, started_at, ended_at, status
                 FROM study_sessions
                 WHERE status = 'Running'
                 ORDER BY started_at DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_study_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::db::{models::StudySession, temp_database};

    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let (_dir, db) = temp_database();
        let session = StudySession::begin(Some("organic chemistry".into()), Utc::now());
        db.insert_study_session(&session).await.unwrap();

        let fetched = db.get_study_session(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.topic.as_deref(), Some("organic chemistry"));
        assert_eq!(fetched.status, StudySessionStatus::Running);
        assert!(db.get_study_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn incomplete_session_is_latest_running_one() {
        let (_dir, db) = temp_database();
        let now = Utc::now();
        let older = StudySession::begin(None, now - Duration::hours(2));
        let newer = StudySession::begin(None, now - Duration::minutes(5));
        db.insert_study_session(&older).await.unwrap();
        db.insert_study_session(&newer).await.unwrap();

        let found = db.get_incomplete_session().await.unwrap().unwrap();
        assert_eq!(found.id, newer.id);

        db.mark_session_status(&newer.id, StudySessionStatus::Interrupted, Some(now))
            .await
            .unwrap();
        db.mark_session_status(&older.id, StudySessionStatus::Completed, Some(now))
            .await
            .unwrap();
        assert!(db.get_incomplete_session().await.unwrap().is_none());

        let ended = db.get_study_session(&newer.id).await.unwrap().unwrap();
        assert_eq!(ended.status, StudySessionStatus::Interrupted);
        assert!(ended.ended_at.is_some());
    }
}
