use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLExec, SQLStore, Transaction, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL mode for better concurrent read performance; foreign keys on
        // so stage rows cannot outlive their case.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

/// Map a rusqlite error, keeping busy/locked distinct for retry handling.
fn map_err(e: rusqlite::Error, fallback: fn(String) -> SQLError) -> SQLError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &e {
        if matches!(
            inner.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return SQLError::Busy(e.to_string());
        }
    }
    fallback(e.to_string())
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| map_err(e, SQLError::Query))?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::new();
            for (i, name) in column_names.iter().enumerate() {
                let val = row_value_at(row, i);
                columns.push((name.clone(), val));
            }
            Ok(Row { columns })
        })
        .map_err(|e| map_err(e, SQLError::Query))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| map_err(e, SQLError::Query))?);
    }
    Ok(result)
}

fn run_exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(|e| map_err(e, SQLError::Execution))?;

    Ok(affected as u64)
}

impl SQLExec for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(&*self.lock()?, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(&*self.lock()?, sql, params)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| map_err(e, SQLError::Execution))
    }
}

impl SQLStore for SqliteStore {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, SQLError> {
        let guard = self.lock()?;
        // IMMEDIATE takes the write lock up front, so everything read inside
        // the transaction is already protected against concurrent writers.
        guard
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| map_err(e, SQLError::Transaction))?;
        Ok(Box::new(SqliteTx {
            guard,
            done: false,
        }))
    }
}

/// An open transaction holding the connection lock.
struct SqliteTx<'a> {
    guard: MutexGuard<'a, Connection>,
    done: bool,
}

impl SQLExec for SqliteTx<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(&self.guard, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(&self.guard, sql, params)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        self.guard
            .execute_batch(sql)
            .map_err(|e| map_err(e, SQLError::Execution))
    }
}

impl Transaction for SqliteTx<'_> {
    fn commit(mut self: Box<Self>) -> Result<(), SQLError> {
        self.done = true;
        self.guard.execute_batch("COMMIT").map_err(|e| {
            // A failed COMMIT leaves the transaction open; close it here so
            // the connection is usable for the next begin().
            let _ = self.guard.execute_batch("ROLLBACK");
            map_err(e, SQLError::Transaction)
        })
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.done {
            // Error path or early return: roll back everything.
            let _ = self.guard.execute_batch("ROLLBACK");
        }
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    // Try integer first, then real, then text, then blob, then null.
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Value::Integer(i);
    }
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Value::Real(f);
    }
    if let Ok(s) = row.get::<_, String>(idx) {
        return Value::Text(s);
    }
    if let Ok(b) = row.get::<_, Vec<u8>>(idx) {
        return Value::Blob(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let s = SqliteStore::open_in_memory().unwrap();
        s.exec(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )
        .unwrap();
        s
    }

    #[test]
    fn exec_and_query_roundtrip() {
        let s = store();
        s.exec(
            "INSERT INTO t (id, name) VALUES (?1, ?2)",
            &[Value::Integer(1), Value::Text("crown".into())],
        )
        .unwrap();

        let rows = s.query("SELECT id, name FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("id"), Some(1));
        assert_eq!(rows[0].get_str("name"), Some("crown"));
    }

    #[test]
    fn committed_transaction_persists() {
        let s = store();
        let tx = s.begin().unwrap();
        tx.exec(
            "INSERT INTO t (id, name) VALUES (?1, ?2)",
            &[Value::Integer(1), Value::Text("a".into())],
        )
        .unwrap();
        tx.commit().unwrap();

        let rows = s.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let s = store();
        {
            let tx = s.begin().unwrap();
            tx.exec(
                "INSERT INTO t (id, name) VALUES (?1, ?2)",
                &[Value::Integer(1), Value::Text("a".into())],
            )
            .unwrap();
            // dropped without commit
        }
        let rows = s.query("SELECT id FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn transaction_sees_own_writes() {
        let s = store();
        let tx = s.begin().unwrap();
        tx.exec(
            "INSERT INTO t (id, name) VALUES (?1, ?2)",
            &[Value::Integer(7), Value::Text("inlay".into())],
        )
        .unwrap();
        let rows = tx.query("SELECT name FROM t WHERE id = ?1", &[Value::Integer(7)]).unwrap();
        assert_eq!(rows[0].get_str("name"), Some("inlay"));
        tx.commit().unwrap();
    }

    #[test]
    fn open_on_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.sqlite");
        {
            let s = SqliteStore::open(&path).unwrap();
            s.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[]).unwrap();
            s.exec("INSERT INTO t (id) VALUES (?1)", &[Value::Integer(1)]).unwrap();
        }
        let s = SqliteStore::open(&path).unwrap();
        let rows = s.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn failed_commit_rolls_back_and_frees_connection() {
        let s = store();
        // Deferred FK: the violation only surfaces at COMMIT time.
        s.exec_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);\
             CREATE TABLE child (id INTEGER PRIMARY KEY, \
               pid INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED);",
        )
        .unwrap();

        let tx = s.begin().unwrap();
        tx.exec(
            "INSERT INTO child (id, pid) VALUES (?1, ?2)",
            &[Value::Integer(1), Value::Integer(99)],
        )
        .unwrap();
        assert!(tx.commit().is_err());

        // The connection must be out of the failed transaction: a fresh
        // begin works and the orphan row is gone.
        let tx = s.begin().unwrap();
        let rows = tx.query("SELECT id FROM child", &[]).unwrap();
        assert!(rows.is_empty());
        tx.commit().unwrap();
    }

    #[test]
    fn upsert_returning_increments() {
        let s = store();
        s.exec(
            "CREATE TABLE seq (k TEXT PRIMARY KEY, v INTEGER NOT NULL)",
            &[],
        )
        .unwrap();
        for expect in 1..=3i64 {
            let rows = s
                .query(
                    "INSERT INTO seq (k, v) VALUES (?1, 1) \
                     ON CONFLICT(k) DO UPDATE SET v = v + 1 RETURNING v",
                    &[Value::Text("case_number".into())],
                )
                .unwrap();
            assert_eq!(rows[0].get_i64("v"), Some(expect));
        }
    }
}
