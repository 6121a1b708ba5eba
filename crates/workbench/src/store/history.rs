// history table access: append with trimming, newest-first listing, delete.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rpcdesk_common::types::HistoryRecord;
use rusqlite::{params, Connection};

/// Rows kept after every append.
pub const MAX_HISTORY_SIZE: usize = 500;

/// A history row before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryRecord {
    pub server_id: i64,
    pub service: String,
    pub method: String,
    pub request: String,
    pub response: String,
    pub request_headers: String,
    pub context_values: String,
    pub status_code: i32,
    pub execution_time_ms: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct HistoryTable;

impl HistoryTable {
    /// Insert a row and trim the table to the newest `MAX_HISTORY_SIZE` rows.
    pub fn append(conn: &mut Connection, record: &NewHistoryRecord) -> Result<i64> {
        let tx = conn.transaction().context("failed to start history transaction")?;
        tx.execute(
            "INSERT INTO history \
             (server_id, service, method, request, response, request_headers, context_values, \
              status_code, execution_time_ms, error, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.server_id,
                record.service,
                record.method,
                record.request,
                record.response,
                record.request_headers,
                record.context_values,
                record.status_code,
                record.execution_time_ms,
                record.error,
                record.created_at.to_rfc3339(),
            ],
        )
        .context("failed to insert history row")?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM history WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
            params![MAX_HISTORY_SIZE as i64],
        )
        .context("failed to trim history")?;
        tx.commit().context("failed to commit history transaction")?;
        Ok(id)
    }

    /// Newest first, optionally for one server.
    pub fn list(conn: &Connection, server_id: Option<i64>, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, server_id, service, method, request, response, request_headers, \
                        context_values, status_code, execution_time_ms, error, created_at \
                 FROM history \
                 WHERE ?1 IS NULL OR server_id = ?1 \
                 ORDER BY id DESC \
                 LIMIT ?2",
            )
            .context("failed to prepare history query")?;

        let rows = stmt
            .query_map(params![server_id, limit as i64], row_to_record)
            .context("failed to query history")?;

        rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect history rows")
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<HistoryRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, server_id, service, method, request, response, request_headers, \
                        context_values, status_code, execution_time_ms, error, created_at \
                 FROM history \
                 WHERE id = ?1",
            )
            .context("failed to prepare history by id query")?;

        let mut rows = stmt.query_map(params![id], row_to_record).context("failed to query history by id")?;

        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to decode history row")?)),
            None => Ok(None),
        }
    }

    /// Returns false when no such row existed.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let changed =
            conn.execute("DELETE FROM history WHERE id = ?1", params![id]).context("failed to delete history row")?;
        Ok(changed > 0)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let created_at: String = row.get(11)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(error)))?;
    Ok(HistoryRecord {
        id: row.get(0)?,
        server_id: row.get(1)?,
        service: row.get(2)?,
        method: row.get(3)?,
        request: row.get(4)?,
        response: row.get(5)?,
        request_headers: row.get(6)?,
        context_values: row.get(7)?,
        status_code: row.get(8)?,
        execution_time_ms: row.get(9)?,
        error: row.get(10)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::meta_db::MetaDb;

    fn setup() -> (MetaDb, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = MetaDb::open(dir.path().join("rpcdesk.db")).expect("db should open");
        (db, dir)
    }

    fn rec(server_id: i64, method: &str) -> NewHistoryRecord {
        NewHistoryRecord {
            server_id,
            service: "pkg.Greeter".to_string(),
            method: method.to_string(),
            request: r#"{"name": "x"}"#.to_string(),
            response: r#"{"message": "hi"}"#.to_string(),
            request_headers: String::new(),
            context_values: String::new(),
            status_code: 0,
            execution_time_ms: 12,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn append_and_get_roundtrip() {
        let (mut db, _dir) = setup();
        let mut row = rec(1, "SayHello");
        row.error = Some("deadline exceeded".into());
        let id = HistoryTable::append(db.connection_mut(), &row).expect("append should succeed");

        let loaded = HistoryTable::get(db.connection(), id).unwrap().expect("row should exist");
        assert_eq!(loaded.method, "SayHello");
        assert_eq!(loaded.error.as_deref(), Some("deadline exceeded"));
        assert_eq!(loaded.created_at.timestamp(), row.created_at.timestamp());
        assert!(HistoryTable::get(db.connection(), id + 1).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_filters_by_server() {
        let (mut db, _dir) = setup();
        HistoryTable::append(db.connection_mut(), &rec(1, "A")).unwrap();
        HistoryTable::append(db.connection_mut(), &rec(2, "B")).unwrap();
        HistoryTable::append(db.connection_mut(), &rec(1, "C")).unwrap();

        let all = HistoryTable::list(db.connection(), None, 10).unwrap();
        assert_eq!(all.iter().map(|r| r.method.as_str()).collect::<Vec<_>>(), vec!["C", "B", "A"]);

        let server_one = HistoryTable::list(db.connection(), Some(1), 10).unwrap();
        assert_eq!(server_one.iter().map(|r| r.method.as_str()).collect::<Vec<_>>(), vec!["C", "A"]);

        assert_eq!(HistoryTable::list(db.connection(), None, 1).unwrap().len(), 1);
    }

    #[test]
    fn append_trims_to_max_size() {
        let (mut db, _dir) = setup();
        let mut last = 0;
        for n in 0..(MAX_HISTORY_SIZE + 5) {
            last = HistoryTable::append(db.connection_mut(), &rec(1, &format!("M{n}"))).unwrap();
        }
        let all = HistoryTable::list(db.connection(), None, MAX_HISTORY_SIZE * 2).unwrap();
        assert_eq!(all.len(), MAX_HISTORY_SIZE);
        assert_eq!(all[0].id, last);
    }

    #[test]
    fn delete_removes_row() {
        let (mut db, _dir) = setup();
        let id = HistoryTable::append(db.connection_mut(), &rec(1, "A")).unwrap();
        assert!(HistoryTable::delete(db.connection(), id).unwrap());
        assert!(!HistoryTable::delete(db.connection(), id).unwrap());
        assert!(HistoryTable::list(db.connection(), None, 10).unwrap().is_empty());
    }
}
