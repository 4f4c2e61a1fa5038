use std::sync::Arc;

use labdent_core::ServiceError;
use labdent_sql::{Row, SQLError, SQLExec, SQLStore, Value};

use crate::model::{AuditEntry, Case, CaseListQuery, CaseStatus, Stage};

/// SQL schema for the cases module.
///
/// Entities are stored as JSON in `data` with the columns the engine
/// filters or orders by duplicated alongside. `tenant_sequences` is the
/// per-tenant counter backing case numbers; `case_audit` is append-only.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cases (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    case_number INTEGER NOT NULL,
    data        TEXT NOT NULL,
    status      TEXT NOT NULL,
    priority    TEXT NOT NULL,
    sla_date    TEXT,
    created_at  TEXT NOT NULL,
    UNIQUE (tenant_id, case_number)
);
CREATE INDEX IF NOT EXISTS idx_cases_tenant_status ON cases(tenant_id, status);

CREATE TABLE IF NOT EXISTS case_stages (
    id          TEXT PRIMARY KEY,
    case_id     TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    stage_order INTEGER NOT NULL,
    data        TEXT NOT NULL,
    status      TEXT NOT NULL,
    UNIQUE (case_id, stage_order)
);
CREATE INDEX IF NOT EXISTS idx_stages_case ON case_stages(case_id);

CREATE TABLE IF NOT EXISTS tenant_sequences (
    tenant_id     TEXT NOT NULL,
    sequence_type TEXT NOT NULL,
    current_value INTEGER NOT NULL,
    PRIMARY KEY (tenant_id, sequence_type)
);

CREATE TABLE IF NOT EXISTS case_audit (
    id             TEXT PRIMARY KEY,
    entity         TEXT NOT NULL,
    entity_id      TEXT NOT NULL,
    action         TEXT NOT NULL,
    payload_before TEXT,
    payload_after  TEXT,
    actor_id       TEXT,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_entity ON case_audit(entity, entity_id);
";

/// Sequence type for case numbers (`tenant_sequences.sequence_type`).
pub const SEQ_CASE_NUMBER: &str = "case_number";

/// Map a storage error, keeping busy/locked contention retryable.
pub(crate) fn map_sql(e: SQLError) -> ServiceError {
    if e.is_busy() {
        ServiceError::Conflict(e.to_string())
    } else {
        ServiceError::Storage(e.to_string())
    }
}

/// Persistent storage for cases, stages, sequences and audit entries.
///
/// Reads outside a unit of work go through the store's own handle; every
/// write takes an explicit executor so it lands inside the caller's
/// transaction.
pub struct CaseStore {
    db: Arc<dyn SQLStore>,
}

impl CaseStore {
    /// Create a new CaseStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("cases schema init: {e}")))?;
        Ok(Self { db })
    }

    /// The underlying database handle, for read-only statements.
    pub fn db(&self) -> &dyn SQLExec {
        self.db.as_ref()
    }

    /// Begin a unit of work.
    pub fn begin(&self) -> Result<Box<dyn labdent_sql::Transaction + '_>, ServiceError> {
        self.db.begin().map_err(map_sql)
    }

    // -----------------------------------------------------------------------
    // Sequence allocation
    // -----------------------------------------------------------------------

    /// Allocate the next value of a per-tenant sequence.
    ///
    /// A single conditional upsert-and-increment: concurrent allocators for
    /// the same `(tenant_id, sequence_type)` are serialized by the row
    /// write, so each caller observes a distinct value and the counter never
    /// repeats. First use yields 1. Must run inside the transaction of the
    /// entity consuming the number, so a failed creation rolls the
    /// increment back and leaves no gap.
    pub fn allocate_sequence(
        &self,
        exec: &dyn SQLExec,
        tenant_id: &str,
        sequence_type: &str,
    ) -> Result<i64, ServiceError> {
        let rows = exec
            .query(
                "INSERT INTO tenant_sequences (tenant_id, sequence_type, current_value) \
                 VALUES (?1, ?2, 1) \
                 ON CONFLICT(tenant_id, sequence_type) \
                 DO UPDATE SET current_value = current_value + 1 \
                 RETURNING current_value",
                &[
                    Value::Text(tenant_id.to_string()),
                    Value::Text(sequence_type.to_string()),
                ],
            )
            .map_err(map_sql)?;

        rows.first()
            .and_then(|r| r.get_i64("current_value"))
            .ok_or_else(|| {
                ServiceError::Internal("sequence allocation returned no value".to_string())
            })
    }

    // -----------------------------------------------------------------------
    // Cases
    // -----------------------------------------------------------------------

    /// Insert a new case.
    pub fn insert_case(&self, exec: &dyn SQLExec, case: &Case) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(case).map_err(|e| ServiceError::Internal(e.to_string()))?;

        exec.exec(
            "INSERT INTO cases \
             (id, tenant_id, case_number, data, status, priority, sla_date, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            &[
                Value::Text(case.id.clone()),
                Value::Text(case.tenant_id.clone()),
                Value::Integer(case.case_number),
                Value::Text(data),
                Value::Text(case.status.as_str().to_string()),
                Value::Text(case.priority.as_str().to_string()),
                Value::opt_text(case.sla_date.map(|d| d.to_string()).as_deref()),
                Value::Text(case.created_at.clone()),
            ],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    /// Rewrite an existing case row. The id and tenant were verified by the
    /// load that produced `case`, so the update is keyed by id alone.
    pub fn update_case(&self, exec: &dyn SQLExec, case: &Case) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(case).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let affected = exec
            .exec(
                "UPDATE cases SET data = ?2, status = ?3, priority = ?4, sla_date = ?5 \
                 WHERE id = ?1",
                &[
                    Value::Text(case.id.clone()),
                    Value::Text(data),
                    Value::Text(case.status.as_str().to_string()),
                    Value::Text(case.priority.as_str().to_string()),
                    Value::opt_text(case.sla_date.map(|d| d.to_string()).as_deref()),
                ],
            )
            .map_err(map_sql)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("case '{}' not found", case.id)));
        }
        Ok(())
    }

    /// Load a case scoped to a tenant.
    ///
    /// A case owned by another tenant is reported exactly like one that
    /// never existed.
    pub fn get_case(
        &self,
        exec: &dyn SQLExec,
        tenant_id: &str,
        case_id: &str,
    ) -> Result<Case, ServiceError> {
        let rows = exec
            .query(
                "SELECT data FROM cases WHERE id = ?1 AND tenant_id = ?2",
                &[
                    Value::Text(case_id.to_string()),
                    Value::Text(tenant_id.to_string()),
                ],
            )
            .map_err(map_sql)?;

        match rows.first() {
            Some(row) => decode_case(row),
            None => Err(ServiceError::NotFound(format!("case '{case_id}' not found"))),
        }
    }

    /// List cases for a tenant with optional status/priority/assignee filters.
    pub fn list_cases(
        &self,
        exec: &dyn SQLExec,
        tenant_id: &str,
        query: &CaseListQuery,
    ) -> Result<(Vec<Case>, usize), ServiceError> {
        let mut where_clause = String::from("tenant_id = ?1");
        let mut params = vec![Value::Text(tenant_id.to_string())];

        if let Some(status) = &query.status {
            params.push(Value::Text(status.clone()));
            where_clause.push_str(&format!(" AND status = ?{}", params.len()));
        }
        if let Some(priority) = &query.priority {
            params.push(Value::Text(priority.clone()));
            where_clause.push_str(&format!(" AND priority = ?{}", params.len()));
        }
        if let Some(assigned_to) = &query.assigned_to {
            params.push(Value::Text(assigned_to.clone()));
            where_clause.push_str(&format!(
                " AND json_extract(data, '$.assignedTo') = ?{}",
                params.len()
            ));
        }

        let count_rows = exec
            .query(
                &format!("SELECT COUNT(*) AS n FROM cases WHERE {where_clause}"),
                &params,
            )
            .map_err(map_sql)?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("n"))
            .unwrap_or(0) as usize;

        params.push(Value::Integer(query.limit as i64));
        let limit_idx = params.len();
        params.push(Value::Integer(query.offset as i64));
        let offset_idx = params.len();

        let rows = exec
            .query(
                &format!(
                    "SELECT data FROM cases WHERE {where_clause} \
                     ORDER BY case_number DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
                ),
                &params,
            )
            .map_err(map_sql)?;

        let mut cases = Vec::with_capacity(rows.len());
        for row in &rows {
            cases.push(decode_case(row)?);
        }
        Ok((cases, total))
    }

    /// All active cases for the Kanban board, in board order: priority
    /// descending, SLA date ascending (missing deadlines last), creation
    /// ascending. Recomputed on every read; nothing is cached.
    pub fn board_cases(
        &self,
        exec: &dyn SQLExec,
        tenant_id: &str,
    ) -> Result<Vec<Case>, ServiceError> {
        let statuses = CaseStatus::board_statuses()
            .map(|s| format!("'{}'", s.as_str()))
            .join(", ");

        let rows = exec
            .query(
                &format!(
                    "SELECT data FROM cases \
                     WHERE tenant_id = ?1 AND status IN ({statuses}) \
                     ORDER BY \
                       CASE priority WHEN 'CRITICAL' THEN 0 WHEN 'URGENT' THEN 1 ELSE 2 END, \
                       sla_date IS NULL, sla_date ASC, created_at ASC"
                ),
                &[Value::Text(tenant_id.to_string())],
            )
            .map_err(map_sql)?;

        let mut cases = Vec::with_capacity(rows.len());
        for row in &rows {
            cases.push(decode_case(row)?);
        }
        Ok(cases)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Insert one stage row.
    pub fn insert_stage(&self, exec: &dyn SQLExec, stage: &Stage) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(stage).map_err(|e| ServiceError::Internal(e.to_string()))?;

        exec.exec(
            "INSERT INTO case_stages (id, case_id, stage_order, data, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                Value::Text(stage.id.clone()),
                Value::Text(stage.case_id.clone()),
                Value::Integer(stage.stage_order),
                Value::Text(data),
                Value::Text(stage.status.as_str().to_string()),
            ],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    /// Rewrite an existing stage row.
    pub fn update_stage(&self, exec: &dyn SQLExec, stage: &Stage) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(stage).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let affected = exec
            .exec(
                "UPDATE case_stages SET data = ?2, status = ?3 WHERE id = ?1",
                &[
                    Value::Text(stage.id.clone()),
                    Value::Text(data),
                    Value::Text(stage.status.as_str().to_string()),
                ],
            )
            .map_err(map_sql)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "stage '{}' not found",
                stage.id
            )));
        }
        Ok(())
    }

    /// All stages of a case, ordered by `stage_order` ascending.
    pub fn get_stages(
        &self,
        exec: &dyn SQLExec,
        case_id: &str,
    ) -> Result<Vec<Stage>, ServiceError> {
        let rows = exec
            .query(
                "SELECT data FROM case_stages WHERE case_id = ?1 ORDER BY stage_order ASC",
                &[Value::Text(case_id.to_string())],
            )
            .map_err(map_sql)?;

        let mut stages = Vec::with_capacity(rows.len());
        for row in &rows {
            stages.push(decode_stage(row)?);
        }
        Ok(stages)
    }

    // -----------------------------------------------------------------------
    // Audit
    // -----------------------------------------------------------------------

    /// Append one audit entry. Entries are facts; nothing ever updates or
    /// deletes them.
    pub fn append_audit(
        &self,
        exec: &dyn SQLExec,
        entry: &AuditEntry,
    ) -> Result<(), ServiceError> {
        let before = match &entry.payload_before {
            Some(v) => Value::Text(v.to_string()),
            None => Value::Null,
        };
        let after = match &entry.payload_after {
            Some(v) => Value::Text(v.to_string()),
            None => Value::Null,
        };

        exec.exec(
            "INSERT INTO case_audit \
             (id, entity, entity_id, action, payload_before, payload_after, actor_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            &[
                Value::Text(entry.id.clone()),
                Value::Text(entry.entity.clone()),
                Value::Text(entry.entity_id.clone()),
                Value::Text(entry.action.clone()),
                before,
                after,
                Value::opt_text(entry.actor_id.as_deref()),
                Value::Text(entry.created_at.clone()),
            ],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    /// Audit trail of one entity, oldest first. The table is append-only,
    /// so rowid is insertion order.
    pub fn list_audit(
        &self,
        exec: &dyn SQLExec,
        entity: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        let rows = exec
            .query(
                "SELECT id, entity, entity_id, action, payload_before, payload_after, \
                        actor_id, created_at \
                 FROM case_audit WHERE entity = ?1 AND entity_id = ?2 \
                 ORDER BY rowid ASC",
                &[
                    Value::Text(entity.to_string()),
                    Value::Text(entity_id.to_string()),
                ],
            )
            .map_err(map_sql)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(decode_audit(row)?);
        }
        Ok(entries)
    }
}

fn decode_case(row: &Row) -> Result<Case, ServiceError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("case row missing data column".to_string()))?;
    serde_json::from_str(data)
        .map_err(|e| ServiceError::Internal(format!("corrupt case record: {e}")))
}

fn decode_stage(row: &Row) -> Result<Stage, ServiceError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("stage row missing data column".to_string()))?;
    serde_json::from_str(data)
        .map_err(|e| ServiceError::Internal(format!("corrupt stage record: {e}")))
}

fn decode_audit(row: &Row) -> Result<AuditEntry, ServiceError> {
    let parse_payload = |name: &str| -> Result<Option<serde_json::Value>, ServiceError> {
        match row.get_str(name) {
            Some(s) => serde_json::from_str(s)
                .map(Some)
                .map_err(|e| ServiceError::Internal(format!("corrupt audit payload: {e}"))),
            None => Ok(None),
        }
    };

    Ok(AuditEntry {
        id: row
            .get_str("id")
            .ok_or_else(|| ServiceError::Internal("audit row missing id".to_string()))?
            .to_string(),
        entity: row.get_str("entity").unwrap_or_default().to_string(),
        entity_id: row.get_str("entity_id").unwrap_or_default().to_string(),
        action: row.get_str("action").unwrap_or_default().to_string(),
        payload_before: parse_payload("payload_before")?,
        payload_after: parse_payload("payload_after")?,
        actor_id: row.get_str("actor_id").map(|s| s.to_string()),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
    })
}
