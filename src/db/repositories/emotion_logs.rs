use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_emotion, parse_optional_emotion, to_i64},
    models::EmotionLog,
};

fn row_to_emotion_log(row: &Row) -> Result<EmotionLog> {
    let emotion: String = row.get("emotion")?;
    let facial_emotion: Option<String> = row.get("facial_emotion")?;
    let voice_emotion: Option<String> = row.get("voice_emotion")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(EmotionLog {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        emotion: parse_emotion(&emotion, "emotion")?,
        confidence: row.get("confidence")?,
        source: row.get("source")?,
        facial_emotion: parse_optional_emotion(facial_emotion, "facial_emotion")?,
        facial_confidence: row.get("facial_confidence")?,
        voice_emotion: parse_optional_emotion(voice_emotion, "voice_emotion")?,
        voice_confidence: row.get("voice_confidence")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
    })
}

impl Database {
    /// Returns the new row id.
    pub async fn insert_emotion_log(&self, log: &EmotionLog) -> Result<i64> {
        let record = log.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO emotion_logs (
                    session_id,
                    emotion,
                    confidence,
                    source,
                    facial_emotion,
                    facial_confidence,
                    voice_emotion,
                    voice_confidence,
                    timestamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.session_id,
                    record.emotion.as_str(),
                    record.confidence,
                    record.source,
                    record.facial_emotion.map(|label| label.as_str()),
                    record.facial_confidence,
                    record.voice_emotion.map(|label| label.as_str()),
                    record.voice_confidence,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Up to `limit` logs for a session, newest first.
    pub async fn get_emotion_history(&self, session_id: &str, limit: usize) -> Result<Vec<EmotionLog>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    session_id,
                    emotion,
                    confidence,
                    source,
                    facial_emotion,
                    facial_confidence,
                    voice_emotion,
                    voice_confidence,
                    timestamp
                FROM emotion_logs
                WHERE session_id = ?1
                ORDER BY timestamp DESC, id DESC
                LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![session_id, to_i64(limit)?])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_emotion_log(row)?);
            }

            Ok(logs)
        })
        .await
    }
}
