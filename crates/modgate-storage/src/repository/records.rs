//! Moderation records repository.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{ModerationRecord, NewModerationRecord, RecordKind};

/// Repository for moderation result rows.
pub struct RecordsRepo;

impl RecordsRepo {
    /// Insert a record unless one with the same kind and text exists.
    ///
    /// Returns true if a row was written. Existing rows are left untouched.
    pub fn insert_if_absent(conn: &Connection, record: &NewModerationRecord) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT INTO moderation_results (kind, text, result) VALUES (?1, ?2, ?3)
             ON CONFLICT(kind, text) DO NOTHING",
            params![record.kind.as_str(), record.text, record.result],
        )?;

        Ok(inserted > 0)
    }

    /// Get a record by its kind and text.
    pub fn get_by_text(
        conn: &Connection,
        kind: RecordKind,
        text: &str,
    ) -> Result<Option<ModerationRecord>> {
        let record = conn
            .query_row(
                "SELECT id, kind, text, result, created_at FROM moderation_results
                 WHERE kind = ?1 AND text = ?2",
                params![kind.as_str(), text],
                |row| {
                    Ok(ModerationRecord {
                        id: row.get(0)?,
                        kind: row
                            .get::<_, String>(1)
                            .ok()
                            .and_then(|s| RecordKind::parse(&s))
                            .unwrap_or(RecordKind::Text),
                        text: row.get(2)?,
                        result: row.get(3)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// Count stored records.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM moderation_results", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

/// Parse SQLite's `datetime('now')` format.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        Schema::Records.migrate(&conn).unwrap();
        conn
    }

    fn record(text: &str, result: &str) -> NewModerationRecord {
        record_of(RecordKind::Text, text, result)
    }

    fn record_of(kind: RecordKind, text: &str, result: &str) -> NewModerationRecord {
        NewModerationRecord {
            kind,
            text: text.to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();

        assert!(RecordsRepo::insert_if_absent(&conn, &record("hello", r#"{"a":1}"#)).unwrap());

        let stored = RecordsRepo::get_by_text(&conn, RecordKind::Text, "hello").unwrap().unwrap();
        assert_eq!(stored.text, "hello");
        assert_eq!(stored.result, r#"{"a":1}"#);
    }

    #[test]
    fn test_duplicate_text_keeps_first() {
        let conn = setup_db();

        assert!(RecordsRepo::insert_if_absent(&conn, &record("dup", "first")).unwrap());
        assert!(!RecordsRepo::insert_if_absent(&conn, &record("dup", "second")).unwrap());

        let stored = RecordsRepo::get_by_text(&conn, RecordKind::Text, "dup").unwrap().unwrap();
        assert_eq!(stored.result, "first");
        assert_eq!(RecordsRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_same_text_under_both_kinds() {
        let conn = setup_db();
        let payloads = r#"["cap","https://x/a.png"]"#;

        assert!(RecordsRepo::insert_if_absent(&conn, &record(payloads, "single")).unwrap());
        assert!(
            RecordsRepo::insert_if_absent(&conn, &record_of(RecordKind::Batch, payloads, "pair"))
                .unwrap()
        );

        let batch = RecordsRepo::get_by_text(&conn, RecordKind::Batch, payloads)
            .unwrap()
            .unwrap();
        assert_eq!(batch.kind, RecordKind::Batch);
        assert_eq!(batch.result, "pair");
        assert_eq!(RecordsRepo::count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_get_missing() {
        let conn = setup_db();
        assert!(RecordsRepo::get_by_text(&conn, RecordKind::Text, "nope").unwrap().is_none());
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2025-02-08 20:15:30");
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S").to_string(), "2025-02-08T20:15:30");
    }
}
