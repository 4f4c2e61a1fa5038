use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CaseStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a case.
///
/// ```text
/// RECEIVED → IN_PRODUCTION → (WAITING_APPROVAL ⇄ APPROVED) → READY_FOR_DELIVERY → DELIVERED
///                                                                               → CANCELLED
/// ```
///
/// RECEIVED → IN_PRODUCTION and * → READY_FOR_DELIVERY are derived from stage
/// activity; WAITING_APPROVAL and APPROVED are only ever set manually from the
/// Kanban board. DELIVERED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Received,
    InProduction,
    WaitingApproval,
    Approved,
    ReadyForDelivery,
    Delivered,
    Cancelled,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::InProduction => "IN_PRODUCTION",
            Self::WaitingApproval => "WAITING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::ReadyForDelivery => "READY_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RECEIVED" => Some(Self::Received),
            "IN_PRODUCTION" => Some(Self::InProduction),
            "WAITING_APPROVAL" => Some(Self::WaitingApproval),
            "APPROVED" => Some(Self::Approved),
            "READY_FOR_DELIVERY" => Some(Self::ReadyForDelivery),
            "DELIVERED" => Some(Self::Delivered),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the case has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether this status appears as a Kanban board column.
    ///
    /// These are also the only legal targets for a manual board move;
    /// DELIVERED and CANCELLED have dedicated operations.
    pub fn is_board_status(&self) -> bool {
        !self.is_terminal()
    }

    /// The Kanban board columns, in display order.
    pub fn board_statuses() -> [CaseStatus; 5] {
        [
            Self::Received,
            Self::InProduction,
            Self::WaitingApproval,
            Self::Approved,
            Self::ReadyForDelivery,
        ]
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageStatus / StageAction
// ---------------------------------------------------------------------------

/// Lifecycle state of a single production stage.
///
/// ```text
/// PENDING → IN_PROGRESS → COMPLETED
///         ↘ ──────────── ↘ SKIPPED
/// ```
///
/// COMPLETED and SKIPPED are terminal per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Whether the stage has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested action on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageAction {
    Start,
    Complete,
    Skip,
}

impl StageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for StageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority / Modality
// ---------------------------------------------------------------------------

/// Case priority; orders the Kanban board within a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Normal,
    Urgent,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Urgent => "URGENT",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(Self::Normal),
            "URGENT" => Some(Self::Urgent),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Production modality of the prosthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Analog,
    Digital,
    Hybrid,
}

// ---------------------------------------------------------------------------
// Case — the aggregate root, maps to one row in `cases`
// ---------------------------------------------------------------------------

/// A single manufacturing job (a dental prosthesis case).
///
/// Owns its stages by composition — they are seeded once at creation and
/// never added to or removed afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub tenant_id: String,

    /// Per-tenant sequential number, assigned exactly once at creation and
    /// never reused, even after cancellation.
    pub case_number: i64,

    // --- descriptive ---
    pub client_id: String,
    pub patient_name: String,
    pub prosthesis_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub modality: Modality,
    /// FDI tooth codes, e.g. `["11", "21"]`. No duplicates.
    #[serde(default)]
    pub teeth: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shade: Option<String>,

    // --- workflow ---
    pub status: CaseStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Promised delivery deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,

    // --- timestamps ---
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Stage — one production step, maps to one row in `case_stages`
// ---------------------------------------------------------------------------

/// One ordered production step within a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub case_id: String,
    pub name: String,
    /// 1-based position within the case, unique per case.
    pub stage_order: i64,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A case together with its ordered stages — the shape all mutating
/// operations return, so callers never need a second read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: Case,
    pub stages: Vec<Stage>,
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// An append-only record of one state transition. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    /// `"case"` or `"stage"`.
    pub entity: String,
    pub entity_id: String,
    /// `CREATED`, `STAGE_MOVED`, `STATUS_CHANGED`, `ASSIGNED`, `DELIVERED`, `CANCELLED`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_after: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    pub client_id: String,
    pub patient_name: String,
    pub prosthesis_type_id: String,
    #[serde(default)]
    pub subtype: Option<String>,
    pub modality: Modality,
    #[serde(default)]
    pub teeth: Vec<String>,
    #[serde(default)]
    pub shade: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Explicit deadline; when absent the SLA calculator derives one from
    /// the catalog lead time.
    #[serde(default)]
    pub sla_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveStageRequest {
    pub action: StageAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: CaseStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    pub delivery_method: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assigned_to: Option<String>,
}

/// Query filters for `GET /cases`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for CaseListQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            assigned_to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// One Kanban board column: a status and its cases, already ordered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: CaseStatus,
    pub cases: Vec<Case>,
}

// ---------------------------------------------------------------------------
// FDI tooth code validation
// ---------------------------------------------------------------------------

/// Validate a set of FDI tooth codes.
///
/// Permanent teeth are 11–18, 21–28, 31–38, 41–48; primary teeth are 51–55,
/// 61–65, 71–75, 81–85. Duplicates are rejected at the boundary.
pub fn validate_teeth(teeth: &[String]) -> Result<(), String> {
    let mut seen = std::collections::BTreeSet::new();
    for code in teeth {
        if !is_fdi_code(code) {
            return Err(format!("'{code}' is not a valid FDI tooth code"));
        }
        if !seen.insert(code.as_str()) {
            return Err(format!("duplicate tooth code '{code}'"));
        }
    }
    Ok(())
}

fn is_fdi_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return false;
    }
    let quadrant = bytes[0] - b'0';
    let tooth = bytes[1] - b'0';
    match quadrant {
        1..=4 => (1..=8).contains(&tooth),
        5..=8 => (1..=5).contains(&tooth),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_status_parse_roundtrip() {
        for s in [
            CaseStatus::Received,
            CaseStatus::InProduction,
            CaseStatus::WaitingApproval,
            CaseStatus::Approved,
            CaseStatus::ReadyForDelivery,
            CaseStatus::Delivered,
            CaseStatus::Cancelled,
        ] {
            assert_eq!(CaseStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(CaseStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(CaseStatus::Delivered.is_terminal());
        assert!(CaseStatus::Cancelled.is_terminal());
        assert!(!CaseStatus::ReadyForDelivery.is_terminal());
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Skipped.is_terminal());
        assert!(!StageStatus::InProgress.is_terminal());
    }

    #[test]
    fn board_statuses_exclude_terminal() {
        for s in CaseStatus::board_statuses() {
            assert!(s.is_board_status());
        }
        assert!(!CaseStatus::Delivered.is_board_status());
        assert!(!CaseStatus::Cancelled.is_board_status());
    }

    #[test]
    fn status_serde_uses_screaming_snake() {
        let json = serde_json::to_string(&CaseStatus::ReadyForDelivery).unwrap();
        assert_eq!(json, "\"READY_FOR_DELIVERY\"");
        let back: CaseStatus = serde_json::from_str("\"IN_PRODUCTION\"").unwrap();
        assert_eq!(back, CaseStatus::InProduction);
    }

    #[test]
    fn fdi_codes() {
        assert!(is_fdi_code("11"));
        assert!(is_fdi_code("48"));
        assert!(is_fdi_code("55"));
        assert!(is_fdi_code("85"));
        assert!(!is_fdi_code("19")); // permanent quadrant, tooth 9
        assert!(!is_fdi_code("56")); // primary quadrant, tooth 6
        assert!(!is_fdi_code("91"));
        assert!(!is_fdi_code("1"));
        assert!(!is_fdi_code("111"));
        assert!(!is_fdi_code("ab"));
    }

    #[test]
    fn validate_teeth_rejects_duplicates() {
        let teeth = vec!["11".to_string(), "21".to_string(), "11".to_string()];
        let err = validate_teeth(&teeth).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn case_json_roundtrip() {
        let case = Case {
            id: "c1".into(),
            tenant_id: "t1".into(),
            case_number: 42,
            client_id: "cl1".into(),
            patient_name: "M. Dupont".into(),
            prosthesis_type_id: "crown".into(),
            subtype: Some("zirconia".into()),
            modality: Modality::Digital,
            teeth: vec!["11".into(), "21".into()],
            shade: Some("A2".into()),
            status: CaseStatus::Received,
            priority: Priority::Urgent,
            sla_date: NaiveDate::from_ymd_opt(2026, 9, 7),
            assigned_to: None,
            delivered_at: None,
            delivery_method: None,
            created_at: "2026-08-31T10:00:00Z".into(),
            updated_at: "2026-08-31T10:00:00Z".into(),
        };
        let json = serde_json::to_string(&case).unwrap();
        let back: Case = serde_json::from_str(&json).unwrap();
        assert_eq!(case, back);
    }

    #[test]
    fn stage_json_roundtrip() {
        let stage = Stage {
            id: "s1".into(),
            case_id: "c1".into(),
            name: "Waxing".into(),
            stage_order: 2,
            status: StageStatus::InProgress,
            started_at: Some("2026-08-31T10:00:00Z".into()),
            completed_at: None,
            notes: None,
        };
        let json = serde_json::to_string(&stage).unwrap();
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(stage, back);
    }
}
