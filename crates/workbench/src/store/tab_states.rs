// tab_states table access: replace-all save, ordered list, delete.

use anyhow::{Context, Result};
use rpcdesk_common::types::TabStateRecord;
use rusqlite::{params, Connection};

pub struct TabStatesTable;

impl TabStatesTable {
    /// Make the stored set exactly `records`: rows not in the batch are
    /// removed, rows in it are upserted. Runs in one transaction.
    pub fn replace_all(conn: &mut Connection, records: &[TabStateRecord]) -> Result<()> {
        let tx = conn.transaction().context("failed to start tab_states transaction")?;
        tx.execute("DELETE FROM tab_states", []).context("failed to clear tab_states")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO tab_states (tab_id, name, component, state, is_active, sort_order) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(tab_id) DO UPDATE SET \
                        name = excluded.name, component = excluded.component, state = excluded.state, \
                        is_active = excluded.is_active, sort_order = excluded.sort_order",
                )
                .context("failed to prepare tab_states upsert")?;
            for record in records {
                stmt.execute(params![
                    record.tab_id,
                    record.name,
                    record.component,
                    record.state,
                    record.is_active,
                    record.order,
                ])
                .with_context(|| format!("failed to save tab state `{}`", record.tab_id))?;
            }
        }
        tx.commit().context("failed to commit tab_states transaction")
    }

    /// All records ordered by their saved position.
    pub fn list(conn: &Connection) -> Result<Vec<TabStateRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT tab_id, name, component, state, is_active, sort_order \
                 FROM tab_states \
                 ORDER BY sort_order ASC, tab_id ASC",
            )
            .context("failed to prepare tab_states query")?;

        let rows = stmt.query_map([], row_to_record).context("failed to query tab_states")?;

        rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect tab_states rows")
    }

    /// Delete one record. Returns false when no such record existed.
    pub fn delete(conn: &Connection, tab_id: &str) -> Result<bool> {
        let changed = conn
            .execute("DELETE FROM tab_states WHERE tab_id = ?1", params![tab_id])
            .context("failed to delete tab_states row")?;
        Ok(changed > 0)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TabStateRecord> {
    Ok(TabStateRecord {
        tab_id: row.get(0)?,
        name: row.get(1)?,
        component: row.get(2)?,
        state: row.get(3)?,
        is_active: row.get(4)?,
        order: row.get(5)?,
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

    fn rec(id: &str, order: i64, is_active: bool) -> TabStateRecord {
        TabStateRecord {
            tab_id: id.to_string(),
            name: id.to_uppercase(),
            component: "request".to_string(),
            state: format!(r#"{{"methodName":"{id}"}}"#),
            is_active,
            order,
        }
    }

    #[test]
    fn replace_all_then_list_in_order() {
        let (mut db, _dir) = setup();
        let records = vec![rec("b", 1, true), rec("a", 0, false), rec("c", 2, false)];
        TabStatesTable::replace_all(db.connection_mut(), &records).expect("save should succeed");

        let loaded = TabStatesTable::list(db.connection()).expect("list should succeed");
        let ids: Vec<&str> = loaded.iter().map(|r| r.tab_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(loaded[1], rec("b", 1, true));
    }

    #[test]
    fn replace_all_drops_records_missing_from_batch() {
        let (mut db, _dir) = setup();
        TabStatesTable::replace_all(db.connection_mut(), &[rec("a", 0, false), rec("b", 1, true)]).unwrap();
        TabStatesTable::replace_all(db.connection_mut(), &[rec("b", 0, true)]).unwrap();

        let loaded = TabStatesTable::list(db.connection()).unwrap();
        assert_eq!(loaded, vec![rec("b", 0, true)]);
    }

    #[test]
    fn empty_batch_clears_everything() {
        let (mut db, _dir) = setup();
        TabStatesTable::replace_all(db.connection_mut(), &[rec("a", 0, true)]).unwrap();
        TabStatesTable::replace_all(db.connection_mut(), &[]).unwrap();
        assert!(TabStatesTable::list(db.connection()).unwrap().is_empty());
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let (mut db, _dir) = setup();
        TabStatesTable::replace_all(db.connection_mut(), &[rec("a", 0, true)]).unwrap();
        assert!(TabStatesTable::delete(db.connection(), "a").unwrap());
        assert!(!TabStatesTable::delete(db.connection(), "a").unwrap());
    }
}
