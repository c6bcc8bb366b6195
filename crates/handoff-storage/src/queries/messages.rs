// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session message log. User messages drive inactivity tracking; system
//! messages record engine-driven status changes in the transcript.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{MessageSender, SessionMessage};
use rusqlite::params;

use crate::database::Database;
use crate::models::{MESSAGE_COLUMNS, message_from_row};

pub async fn insert_message(db: &Database, message: &SessionMessage) -> Result<(), HandoffError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO session_messages (id, session_id, sender, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id,
                    message.session_id,
                    message.sender.to_string(),
                    message.content,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Timestamp of the most recent message from the given sender, if any.
pub async fn last_message_at(
    db: &Database,
    session_id: &str,
    sender: MessageSender,
) -> Result<Option<DateTime<Utc>>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT created_at FROM session_messages
                 WHERE session_id = ?1 AND sender = ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![session_id, sender.to_string()],
                |row| row.get(0),
            );
            match result {
                Ok(at) => Ok(Some(at)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent messages for a session, newest first.
pub async fn recent_messages(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<SessionMessage>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM session_messages
                 WHERE session_id = ?1
                 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![session_id, limit as i64], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions;
    use handoff_core::types::{ChatSession, SessionStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_session(db: &Database, id: &str) {
        let now = Utc::now();
        sessions::create_session(
            db,
            &ChatSession {
                id: id.to_string(),
                channel: "web".to_string(),
                user_id: None,
                status: SessionStatus::Active,
                last_activity: now,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    fn message(session_id: &str, sender: MessageSender, at: DateTime<Utc>) -> SessionMessage {
        SessionMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            sender,
            content: "hello".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn last_message_filters_by_sender() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        let t0 = Utc::now();
        insert_message(&db, &message("s1", MessageSender::User, t0))
            .await
            .unwrap();
        insert_message(
            &db,
            &message("s1", MessageSender::Operator, t0 + chrono::Duration::seconds(5)),
        )
        .await
        .unwrap();

        assert_eq!(
            last_message_at(&db, "s1", MessageSender::User).await.unwrap(),
            Some(t0)
        );
        assert!(
            last_message_at(&db, "s1", MessageSender::System)
                .await
                .unwrap()
                .is_none()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_messages_newest_first() {
        let (db, _dir) = setup_db().await;
        seed_session(&db, "s1").await;
        let t0 = Utc::now();
        for i in 0..5 {
            insert_message(
                &db,
                &message("s1", MessageSender::User, t0 + chrono::Duration::seconds(i)),
            )
            .await
            .unwrap();
        }

        let recent = recent_messages(&db, "s1", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].created_at > recent[2].created_at);

        db.close().await.unwrap();
    }
}
