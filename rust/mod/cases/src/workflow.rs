use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use labdent_core::{new_id, now_rfc3339, ServiceError};
use labdent_sql::{SQLExec, SQLStore};

use crate::catalog::{CatalogEntry, ClientDirectory, Notifier, ProsthesisCatalog};
use crate::model::{
    validate_teeth, AuditEntry, BoardColumn, Case, CaseDetail, CaseListQuery, CaseStatus,
    CreateCaseRequest, MoveStageRequest, Stage, StageAction, StageStatus,
};
use crate::sla::add_business_days;
use crate::store::{CaseStore, SEQ_CASE_NUMBER};

/// How many times a create is retried when sequence allocation surfaces
/// write contention. Contention is the only retryable failure class.
const MAX_CREATE_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Status transition function
// ---------------------------------------------------------------------------

/// Everything that can move a case's status.
///
/// Automatic transitions derive from a stage snapshot; the rest are
/// explicit operator actions. Keeping them in one tagged union keeps the
/// whole state machine in one place instead of scattered across call sites.
#[derive(Debug)]
pub enum CaseEvent<'a> {
    /// A stage changed; the slice is the authoritative snapshot of all
    /// sibling stages, re-read inside the same transaction as the write.
    StageTransitioned(&'a [Stage]),
    /// Operator dragged the case to another board column.
    ManualMove(CaseStatus),
    Deliver,
    Cancel,
}

/// Compute the case status an event leads to.
///
/// Returns `Ok(None)` when the status does not change. A DELIVERED or
/// CANCELLED case rejects every event with [`ServiceError::CaseClosed`].
///
/// Derivation rules, in order:
/// 1. all stages terminal (COMPLETED/SKIPPED) → READY_FOR_DELIVERY. This
///    overrides a manually pinned WAITING_APPROVAL/APPROVED — deliberate
///    current behavior, pending product clarification.
/// 2. case RECEIVED and any stage has left PENDING → IN_PRODUCTION.
/// 3. otherwise unchanged; manual pins survive partial stage activity.
pub fn next_status(
    current: CaseStatus,
    event: &CaseEvent<'_>,
) -> Result<Option<CaseStatus>, ServiceError> {
    if current.is_terminal() {
        return Err(ServiceError::CaseClosed(format!(
            "case is {current}; no further transitions are accepted"
        )));
    }

    match event {
        CaseEvent::StageTransitioned(stages) => {
            let all_done =
                !stages.is_empty() && stages.iter().all(|s| s.status.is_terminal());
            if all_done {
                if current == CaseStatus::ReadyForDelivery {
                    Ok(None)
                } else {
                    Ok(Some(CaseStatus::ReadyForDelivery))
                }
            } else if current == CaseStatus::Received
                && stages.iter().any(|s| s.status != StageStatus::Pending)
            {
                Ok(Some(CaseStatus::InProduction))
            } else {
                Ok(None)
            }
        }
        CaseEvent::ManualMove(target) => {
            if !target.is_board_status() {
                return Err(ServiceError::InvalidState(format!(
                    "{target} is not reachable from the board; use the dedicated operation"
                )));
            }
            if *target == current {
                Ok(None)
            } else {
                Ok(Some(*target))
            }
        }
        CaseEvent::Deliver => Ok(Some(CaseStatus::Delivered)),
        CaseEvent::Cancel => Ok(Some(CaseStatus::Cancelled)),
    }
}

/// Apply one operator action to a stage, in place.
///
/// COMPLETED and SKIPPED are terminal: any action on them is an
/// [`ServiceError::InvalidTransition`] naming both states. `start` on an
/// IN_PROGRESS stage re-stamps `started_at` and is accepted as a no-op
/// update rather than an error.
fn apply_stage_action(
    stage: &mut Stage,
    action: StageAction,
    notes: Option<&str>,
    now: &str,
) -> Result<(), ServiceError> {
    if stage.status.is_terminal() {
        return Err(ServiceError::InvalidTransition(format!(
            "stage '{}' is {}, requested {}",
            stage.name, stage.status, action
        )));
    }

    match action {
        StageAction::Start => {
            stage.status = StageStatus::InProgress;
            stage.started_at = Some(now.to_string());
        }
        StageAction::Complete => {
            stage.status = StageStatus::Completed;
            stage.completed_at = Some(now.to_string());
        }
        StageAction::Skip => {
            stage.status = StageStatus::Skipped;
        }
    }

    if let Some(n) = notes {
        stage.notes = Some(n.to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WorkflowEngine — the transactional façade
// ---------------------------------------------------------------------------

/// The case production workflow engine.
///
/// Every public operation runs as one unit of work: sequence allocation,
/// entity writes and audit entries commit together or not at all. The
/// engine holds no state of its own beyond the database; concurrent
/// requests are serialized by the storage layer.
pub struct WorkflowEngine {
    store: CaseStore,
    catalog: Arc<dyn ProsthesisCatalog>,
    directory: Arc<dyn ClientDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowEngine {
    pub fn new(
        db: Arc<dyn SQLStore>,
        catalog: Arc<dyn ProsthesisCatalog>,
        directory: Arc<dyn ClientDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            store: CaseStore::new(db)?,
            catalog,
            directory,
            notifier,
        })
    }

    /// Access the underlying store.
    pub fn store(&self) -> &CaseStore {
        &self.store
    }

    // =======================================================================
    // createCase
    // =======================================================================

    /// Create a case: allocate the tenant's next case number, default the
    /// SLA date from the catalog lead time when the caller gave none, seed
    /// the stages from the type's template, and record the creation.
    pub fn create_case(
        &self,
        tenant_id: &str,
        req: &CreateCaseRequest,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        if req.patient_name.trim().is_empty() {
            return Err(ServiceError::Validation("patientName is required".into()));
        }
        if req.client_id.trim().is_empty() {
            return Err(ServiceError::Validation("clientId is required".into()));
        }
        validate_teeth(&req.teeth).map_err(ServiceError::Validation)?;

        if !self.directory.exists(tenant_id, &req.client_id) {
            return Err(ServiceError::NotFound(format!(
                "client '{}' not found",
                req.client_id
            )));
        }
        let entry = self.catalog.lookup(&req.prosthesis_type_id).ok_or_else(|| {
            ServiceError::NotFound(format!(
                "prosthesis type '{}' not found",
                req.prosthesis_type_id
            ))
        })?;

        let mut attempt = 1;
        loop {
            match self.create_case_once(tenant_id, req, &entry, actor) {
                Err(e) if e.is_retryable() && attempt < MAX_CREATE_ATTEMPTS => {
                    warn!(tenant_id, attempt, error = %e, "case creation contention, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn create_case_once(
        &self,
        tenant_id: &str,
        req: &CreateCaseRequest,
        entry: &CatalogEntry,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        let tx = self.store.begin()?;
        let now = now_rfc3339();

        let case_number = self
            .store
            .allocate_sequence(tx.as_ref(), tenant_id, SEQ_CASE_NUMBER)?;

        let sla_date = req.sla_date.or_else(|| {
            Some(add_business_days(
                Utc::now().date_naive(),
                entry.estimated_lead_days,
            ))
        });

        let case = Case {
            id: new_id(),
            tenant_id: tenant_id.to_string(),
            case_number,
            client_id: req.client_id.clone(),
            patient_name: req.patient_name.clone(),
            prosthesis_type_id: req.prosthesis_type_id.clone(),
            subtype: req.subtype.clone(),
            modality: req.modality,
            teeth: req.teeth.clone(),
            shade: req.shade.clone(),
            status: CaseStatus::Received,
            priority: req.priority,
            sla_date,
            assigned_to: req.assigned_to.clone(),
            delivered_at: None,
            delivery_method: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        self.store.insert_case(tx.as_ref(), &case)?;

        let mut stages = Vec::with_capacity(entry.stage_template.len());
        for (i, name) in entry.stage_template.iter().enumerate() {
            let stage = Stage {
                id: new_id(),
                case_id: case.id.clone(),
                name: name.clone(),
                stage_order: (i + 1) as i64,
                status: StageStatus::Pending,
                started_at: None,
                completed_at: None,
                notes: None,
            };
            self.store.insert_stage(tx.as_ref(), &stage)?;
            stages.push(stage);
        }

        self.audit(tx.as_ref(), "case", &case.id, "CREATED", None, Some(&case), actor)?;

        tx.commit().map_err(crate::store::map_sql)?;
        info!(tenant_id, case_id = %case.id, case_number, "case created");

        Ok(CaseDetail { case, stages })
    }

    // =======================================================================
    // moveStage
    // =======================================================================

    /// Apply a stage action and re-derive the case status from the full
    /// stage snapshot, all inside one transaction.
    pub fn move_stage(
        &self,
        tenant_id: &str,
        case_id: &str,
        stage_id: &str,
        req: &MoveStageRequest,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        let tx = self.store.begin()?;
        let now = now_rfc3339();

        let mut case = self.store.get_case(tx.as_ref(), tenant_id, case_id)?;
        if case.status.is_terminal() {
            return Err(ServiceError::CaseClosed(format!(
                "case #{} is {}; no further transitions are accepted",
                case.case_number, case.status
            )));
        }

        let stages = self.store.get_stages(tx.as_ref(), &case.id)?;
        let mut stage = stages
            .iter()
            .find(|s| s.id == stage_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("stage '{stage_id}' not found")))?;

        let stage_before = stage.clone();
        apply_stage_action(&mut stage, req.action, req.notes.as_deref(), &now)?;
        self.store.update_stage(tx.as_ref(), &stage)?;

        // Authoritative snapshot: re-read the stages after the write, inside
        // the transaction, so derivation never works from stale request
        // input while a sibling transition is committing.
        let snapshot = self.store.get_stages(tx.as_ref(), &case.id)?;

        self.audit(
            tx.as_ref(),
            "stage",
            &stage.id,
            "STAGE_MOVED",
            Some(&stage_before),
            Some(&stage),
            actor,
        )?;

        if let Some(new_status) =
            next_status(case.status, &CaseEvent::StageTransitioned(&snapshot))?
        {
            let case_before = case.clone();
            case.status = new_status;
            case.updated_at = now;
            self.store.update_case(tx.as_ref(), &case)?;
            self.audit(
                tx.as_ref(),
                "case",
                &case.id,
                "STATUS_CHANGED",
                Some(&case_before),
                Some(&case),
                actor,
            )?;
        }

        tx.commit().map_err(crate::store::map_sql)?;
        self.notify_user_facing(&case);

        Ok(CaseDetail {
            case,
            stages: snapshot,
        })
    }

    // =======================================================================
    // updateStatus (Kanban drag)
    // =======================================================================

    /// Manual board move. Any of the five board columns can be dragged to
    /// any other — the board does not enforce a forward-only order.
    /// DELIVERED and CANCELLED are not reachable here. Dropping a card on
    /// its own column is a no-op.
    pub fn update_status(
        &self,
        tenant_id: &str,
        case_id: &str,
        target: CaseStatus,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        let tx = self.store.begin()?;

        let mut case = self.store.get_case(tx.as_ref(), tenant_id, case_id)?;
        let changed = next_status(case.status, &CaseEvent::ManualMove(target))?;

        if let Some(new_status) = changed {
            let case_before = case.clone();
            case.status = new_status;
            case.updated_at = now_rfc3339();
            self.store.update_case(tx.as_ref(), &case)?;
            self.audit(
                tx.as_ref(),
                "case",
                &case.id,
                "STATUS_CHANGED",
                Some(&case_before),
                Some(&case),
                actor,
            )?;
        }

        let stages = self.store.get_stages(tx.as_ref(), &case.id)?;
        tx.commit().map_err(crate::store::map_sql)?;
        if changed.is_some() {
            self.notify_user_facing(&case);
        }

        Ok(CaseDetail { case, stages })
    }

    // =======================================================================
    // deliver / cancel
    // =======================================================================

    /// Mark a case delivered. Not idempotent: delivering twice fails.
    pub fn deliver(
        &self,
        tenant_id: &str,
        case_id: &str,
        delivery_method: &str,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        if delivery_method.trim().is_empty() {
            return Err(ServiceError::Validation("deliveryMethod is required".into()));
        }

        let tx = self.store.begin()?;
        let mut case = self.store.get_case(tx.as_ref(), tenant_id, case_id)?;

        let new_status = next_status(case.status, &CaseEvent::Deliver)?
            .ok_or_else(|| ServiceError::Internal("deliver produced no transition".into()))?;

        let case_before = case.clone();
        case.status = new_status;
        case.delivered_at = Some(now_rfc3339());
        case.delivery_method = Some(delivery_method.to_string());
        case.updated_at = now_rfc3339();
        self.store.update_case(tx.as_ref(), &case)?;
        self.audit(
            tx.as_ref(),
            "case",
            &case.id,
            "DELIVERED",
            Some(&case_before),
            Some(&case),
            actor,
        )?;

        let stages = self.store.get_stages(tx.as_ref(), &case.id)?;
        tx.commit().map_err(crate::store::map_sql)?;
        info!(tenant_id, case_id, "case delivered");
        self.notify_user_facing(&case);

        Ok(CaseDetail { case, stages })
    }

    /// Cancel a case. Legal from any non-terminal status; terminal — no
    /// transition of any kind is accepted afterward.
    pub fn cancel(
        &self,
        tenant_id: &str,
        case_id: &str,
        reason: Option<&str>,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        let tx = self.store.begin()?;
        let mut case = self.store.get_case(tx.as_ref(), tenant_id, case_id)?;

        let new_status = next_status(case.status, &CaseEvent::Cancel)?
            .ok_or_else(|| ServiceError::Internal("cancel produced no transition".into()))?;

        let case_before = case.clone();
        case.status = new_status;
        case.updated_at = now_rfc3339();
        self.store.update_case(tx.as_ref(), &case)?;

        let mut after = serde_json::to_value(&case)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if let (Some(obj), Some(reason)) = (after.as_object_mut(), reason) {
            obj.insert("cancelReason".into(), serde_json::json!(reason));
        }
        let before = serde_json::to_value(&case_before)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.store.append_audit(
            tx.as_ref(),
            &AuditEntry {
                id: new_id(),
                entity: "case".into(),
                entity_id: case.id.clone(),
                action: "CANCELLED".into(),
                payload_before: Some(before),
                payload_after: Some(after),
                actor_id: actor.map(|a| a.to_string()),
                created_at: now_rfc3339(),
            },
        )?;

        let stages = self.store.get_stages(tx.as_ref(), &case.id)?;
        tx.commit().map_err(crate::store::map_sql)?;
        info!(tenant_id, case_id, "case cancelled");

        Ok(CaseDetail { case, stages })
    }

    // =======================================================================
    // assign
    // =======================================================================

    /// Reassign a case to another technician (or nobody).
    pub fn assign(
        &self,
        tenant_id: &str,
        case_id: &str,
        assigned_to: Option<&str>,
        actor: Option<&str>,
    ) -> Result<CaseDetail, ServiceError> {
        let tx = self.store.begin()?;
        let mut case = self.store.get_case(tx.as_ref(), tenant_id, case_id)?;
        if case.status.is_terminal() {
            return Err(ServiceError::CaseClosed(format!(
                "case #{} is {}; no further transitions are accepted",
                case.case_number, case.status
            )));
        }

        let case_before = case.clone();
        case.assigned_to = assigned_to.map(|a| a.to_string());
        case.updated_at = now_rfc3339();
        self.store.update_case(tx.as_ref(), &case)?;
        self.audit(
            tx.as_ref(),
            "case",
            &case.id,
            "ASSIGNED",
            Some(&case_before),
            Some(&case),
            actor,
        )?;

        let stages = self.store.get_stages(tx.as_ref(), &case.id)?;
        tx.commit().map_err(crate::store::map_sql)?;

        Ok(CaseDetail { case, stages })
    }

    // =======================================================================
    // Reads
    // =======================================================================

    /// Load one case with its ordered stages.
    pub fn get_case(&self, tenant_id: &str, case_id: &str) -> Result<CaseDetail, ServiceError> {
        let case = self.store.get_case(self.store.db(), tenant_id, case_id)?;
        let stages = self.store.get_stages(self.store.db(), &case.id)?;
        Ok(CaseDetail { case, stages })
    }

    /// List cases with filters.
    pub fn list_cases(
        &self,
        tenant_id: &str,
        query: &CaseListQuery,
    ) -> Result<(Vec<Case>, usize), ServiceError> {
        self.store.list_cases(self.store.db(), tenant_id, query)
    }

    /// The Kanban board projection: active cases grouped by status, each
    /// column already in board order. Derived data, recomputed per read.
    pub fn board(&self, tenant_id: &str) -> Result<Vec<BoardColumn>, ServiceError> {
        let cases = self.store.board_cases(self.store.db(), tenant_id)?;

        let mut columns: Vec<BoardColumn> = CaseStatus::board_statuses()
            .into_iter()
            .map(|status| BoardColumn {
                status,
                cases: Vec::new(),
            })
            .collect();
        for case in cases {
            if let Some(col) = columns.iter_mut().find(|c| c.status == case.status) {
                col.cases.push(case);
            }
        }
        Ok(columns)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn audit<T: serde::Serialize>(
        &self,
        exec: &dyn SQLExec,
        entity: &str,
        entity_id: &str,
        action: &str,
        before: Option<&T>,
        after: Option<&T>,
        actor: Option<&str>,
    ) -> Result<(), ServiceError> {
        let encode = |v: Option<&T>| -> Result<Option<serde_json::Value>, ServiceError> {
            v.map(serde_json::to_value)
                .transpose()
                .map_err(|e| ServiceError::Internal(e.to_string()))
        };

        self.store.append_audit(
            exec,
            &AuditEntry {
                id: new_id(),
                entity: entity.to_string(),
                entity_id: entity_id.to_string(),
                action: action.to_string(),
                payload_before: encode(before)?,
                payload_after: encode(after)?,
                actor_id: actor.map(|a| a.to_string()),
                created_at: now_rfc3339(),
            },
        )
    }

    /// Best-effort notification for transitions a client cares about.
    /// Failure never rolls anything back; the operation already committed.
    fn notify_user_facing(&self, case: &Case) {
        if !matches!(
            case.status,
            CaseStatus::ReadyForDelivery | CaseStatus::Delivered
        ) {
            return;
        }
        if let Err(e) = self
            .notifier
            .notify(&case.tenant_id, &case.id, case.status.as_str())
        {
            warn!(case_id = %case.id, status = %case.status, error = %e,
                "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(order: i64, status: StageStatus) -> Stage {
        Stage {
            id: format!("s{order}"),
            case_id: "c1".into(),
            name: format!("Stage {order}"),
            stage_order: order,
            status,
            started_at: None,
            completed_at: None,
            notes: None,
        }
    }

    #[test]
    fn terminal_case_rejects_every_event() {
        let stages = [stage(1, StageStatus::Pending)];
        for current in [CaseStatus::Delivered, CaseStatus::Cancelled] {
            for event in [
                CaseEvent::StageTransitioned(&stages),
                CaseEvent::ManualMove(CaseStatus::Received),
                CaseEvent::Deliver,
                CaseEvent::Cancel,
            ] {
                let err = next_status(current, &event).unwrap_err();
                assert!(matches!(err, ServiceError::CaseClosed(_)), "{current} {event:?}");
            }
        }
    }

    #[test]
    fn first_stage_activity_moves_received_to_in_production() {
        let stages = [stage(1, StageStatus::InProgress), stage(2, StageStatus::Pending)];
        let next = next_status(CaseStatus::Received, &CaseEvent::StageTransitioned(&stages));
        assert_eq!(next.unwrap(), Some(CaseStatus::InProduction));
    }

    #[test]
    fn partial_progress_leaves_status_alone() {
        let stages = [stage(1, StageStatus::Completed), stage(2, StageStatus::Pending)];
        let next = next_status(
            CaseStatus::InProduction,
            &CaseEvent::StageTransitioned(&stages),
        );
        assert_eq!(next.unwrap(), None);
    }

    #[test]
    fn manual_pin_survives_partial_stage_activity() {
        let stages = [
            stage(1, StageStatus::Completed),
            stage(2, StageStatus::InProgress),
        ];
        let next = next_status(
            CaseStatus::WaitingApproval,
            &CaseEvent::StageTransitioned(&stages),
        );
        assert_eq!(next.unwrap(), None);
    }

    #[test]
    fn all_stages_done_forces_ready_even_over_manual_pin() {
        let stages = [
            stage(1, StageStatus::Completed),
            stage(2, StageStatus::Skipped),
        ];
        for pinned in [CaseStatus::WaitingApproval, CaseStatus::Approved] {
            let next = next_status(pinned, &CaseEvent::StageTransitioned(&stages));
            assert_eq!(next.unwrap(), Some(CaseStatus::ReadyForDelivery));
        }
    }

    #[test]
    fn all_done_when_already_ready_is_noop() {
        let stages = [stage(1, StageStatus::Completed)];
        let next = next_status(
            CaseStatus::ReadyForDelivery,
            &CaseEvent::StageTransitioned(&stages),
        );
        assert_eq!(next.unwrap(), None);
    }

    #[test]
    fn manual_move_between_board_columns_is_free() {
        // The board is not forward-only: READY_FOR_DELIVERY back to
        // RECEIVED is allowed.
        let next = next_status(
            CaseStatus::ReadyForDelivery,
            &CaseEvent::ManualMove(CaseStatus::Received),
        );
        assert_eq!(next.unwrap(), Some(CaseStatus::Received));
    }

    #[test]
    fn manual_move_to_same_status_is_noop() {
        let next = next_status(
            CaseStatus::Approved,
            &CaseEvent::ManualMove(CaseStatus::Approved),
        );
        assert_eq!(next.unwrap(), None);
    }

    #[test]
    fn manual_move_cannot_reach_terminal_statuses() {
        for target in [CaseStatus::Delivered, CaseStatus::Cancelled] {
            let err = next_status(CaseStatus::Approved, &CaseEvent::ManualMove(target))
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidState(_)));
        }
    }

    #[test]
    fn stage_action_on_terminal_stage_is_invalid() {
        for status in [StageStatus::Completed, StageStatus::Skipped] {
            let mut s = stage(1, status);
            let err =
                apply_stage_action(&mut s, StageAction::Start, None, "now").unwrap_err();
            match err {
                ServiceError::InvalidTransition(msg) => {
                    assert!(msg.contains(status.as_str()));
                    assert!(msg.contains("start"));
                }
                other => panic!("expected InvalidTransition, got {other:?}"),
            }
        }
    }

    #[test]
    fn restart_restamps_started_at() {
        let mut s = stage(1, StageStatus::Pending);
        apply_stage_action(&mut s, StageAction::Start, None, "t1").unwrap();
        assert_eq!(s.started_at.as_deref(), Some("t1"));
        apply_stage_action(&mut s, StageAction::Start, None, "t2").unwrap();
        assert_eq!(s.status, StageStatus::InProgress);
        assert_eq!(s.started_at.as_deref(), Some("t2"));
    }

    #[test]
    fn complete_straight_from_pending() {
        let mut s = stage(1, StageStatus::Pending);
        apply_stage_action(&mut s, StageAction::Complete, Some("done early"), "t1").unwrap();
        assert_eq!(s.status, StageStatus::Completed);
        assert_eq!(s.completed_at.as_deref(), Some("t1"));
        assert_eq!(s.notes.as_deref(), Some("done early"));
    }

    #[test]
    fn skip_keeps_timestamps_empty() {
        let mut s = stage(1, StageStatus::Pending);
        apply_stage_action(&mut s, StageAction::Skip, None, "t1").unwrap();
        assert_eq!(s.status, StageStatus::Skipped);
        assert!(s.started_at.is_none());
        assert!(s.completed_at.is_none());
    }
}
