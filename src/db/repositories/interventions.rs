use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_emotion},
    models::InterventionLog,
};

fn row_to_intervention(row: &Row) -> Result<InterventionLog> {
    let emotion: String = row.get("emotion")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(InterventionLog {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        emotion_log_id: row.get("emotion_log_id")?,
        emotion: parse_emotion(&emotion, "emotion")?,
        intervention_type: row.get("intervention_type")?,
        content: row.get("content")?,
        silent: row.get("silent")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        was_helpful: row.get("was_helpful")?,
    })
}

impl Database {
    /// Returns the new row id.
    pub async fn insert_intervention(&self, intervention: &InterventionLog) -> Result<i64> {
        let record = intervention.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO interventions (
                    session_id,
                    emotion_log_id,
                    emotion,
                    intervention_type,
                    content,
                    silent,
                    timestamp,
                    was_helpful
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.session_id,
                    record.emotion_log_id,
                    record.emotion.as_str(),
                    record.intervention_type,
                    record.content,
                    record.silent,
                    record.timestamp.to_rfc3339(),
                    record.was_helpful,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// All interventions of a session, oldest first.
    pub async fn get_interventions_for_session(&self, session_id: &str) -> Result<Vec<InterventionLog>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    session_id,
                    emotion_log_id,
                    emotion,
                    intervention_type,
                    content,
                    silent,
                    timestamp,
                    was_helpful
                FROM interventions
                WHERE session_id = ?1
                ORDER BY timestamp ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut interventions = Vec::new();
            while let Some(row) = rows.next()? {
                interventions.push(row_to_intervention(row)?);
            }

            Ok(interventions)
        })
        .await
    }

    /// Returns `false` if no intervention has that id.
    pub async fn record_intervention_feedback(&self, intervention_id: i64, helpful: bool) -> Result<bool> {
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE interventions SET was_helpful = ?1 WHERE id = ?2",
                params![helpful, intervention_id],
            )?;
            Ok(updated > 0)
        })
        .await
    }
}
