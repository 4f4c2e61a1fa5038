use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Wrap an optional string, mapping `None` to `Null`.
    pub fn opt_text(s: Option<&str>) -> Value {
        match s {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        }
    }
}

/// A row returned from a SQL query — column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Get a real column value by name.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Real(f)) => Some(*f),
            _ => None,
        }
    }
}

/// Statement execution surface, shared by the store and open transactions.
pub trait SQLExec {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;

    /// Execute a batch of semicolon-separated statements without parameters.
    /// Used for schema initialization.
    fn exec_batch(&self, sql: &str) -> Result<(), SQLError>;
}

/// An open write transaction.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it
/// back. All statements issued through the transaction see each other's
/// uncommitted writes; nothing is visible to other callers until commit.
pub trait Transaction: SQLExec {
    /// Commit the transaction.
    fn commit(self: Box<Self>) -> Result<(), SQLError>;
}

/// SQLStore provides a SQL execution interface backed by an embedded database.
///
/// Auto-commit statements go through [`SQLExec`]; multi-statement units of
/// work go through [`SQLStore::begin`], which serializes writers.
pub trait SQLStore: SQLExec + Send + Sync {
    /// Begin a write transaction. Holds the writer exclusively until the
    /// returned handle is committed or dropped.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, SQLError>;
}
