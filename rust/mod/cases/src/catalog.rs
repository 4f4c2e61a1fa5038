//! Collaborator contracts consumed by the workflow engine.
//!
//! The engine does not own client records, the prosthesis catalog, or
//! notification delivery — it consumes them through these narrow traits.
//! The binary wires real implementations; tests use the static ones below.

use std::collections::HashMap;

use tracing::info;

/// One prosthesis type as the catalog describes it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Lead time in business days, used to default the SLA date.
    pub estimated_lead_days: u32,
    /// Ordered stage names a new case of this type is seeded with.
    pub stage_template: Vec<String>,
}

/// Prosthesis type catalog.
pub trait ProsthesisCatalog: Send + Sync {
    /// Look up a prosthesis type; `None` if unknown.
    fn lookup(&self, prosthesis_type_id: &str) -> Option<CatalogEntry>;
}

/// Client directory, used to validate case creation.
pub trait ClientDirectory: Send + Sync {
    fn exists(&self, tenant_id: &str, client_id: &str) -> bool;
}

/// Best-effort notification sink for user-facing transitions.
///
/// Implementations must be non-blocking; a failure here never rolls back
/// the workflow transaction (the engine degrades it to a warning).
pub trait Notifier: Send + Sync {
    fn notify(&self, tenant_id: &str, case_id: &str, event: &str) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// In-process implementations
// ---------------------------------------------------------------------------

/// Fixed in-memory catalog, keyed by prosthesis type id.
pub struct StaticCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: HashMap<String, CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The stock catalog the standalone server ships with.
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "crown".to_string(),
            CatalogEntry {
                estimated_lead_days: 5,
                stage_template: vec![
                    "Model preparation".into(),
                    "Framework".into(),
                    "Ceramic layering".into(),
                    "Glaze and polish".into(),
                ],
            },
        );
        entries.insert(
            "bridge".to_string(),
            CatalogEntry {
                estimated_lead_days: 7,
                stage_template: vec![
                    "Model preparation".into(),
                    "Framework".into(),
                    "Try-in".into(),
                    "Ceramic layering".into(),
                    "Glaze and polish".into(),
                ],
            },
        );
        entries.insert(
            "full_denture".to_string(),
            CatalogEntry {
                estimated_lead_days: 10,
                stage_template: vec![
                    "Impression check".into(),
                    "Bite registration".into(),
                    "Wax try-in".into(),
                    "Processing".into(),
                    "Finish and polish".into(),
                ],
            },
        );
        Self { entries }
    }
}

impl ProsthesisCatalog for StaticCatalog {
    fn lookup(&self, prosthesis_type_id: &str) -> Option<CatalogEntry> {
        self.entries.get(prosthesis_type_id).cloned()
    }
}

/// Directory that accepts every client id. Used when client records live in
/// an external system the deployment has not wired in.
pub struct AllowAllDirectory;

impl ClientDirectory for AllowAllDirectory {
    fn exists(&self, _tenant_id: &str, _client_id: &str) -> bool {
        true
    }
}

/// Notifier that only logs. The default until a real delivery channel is
/// configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, tenant_id: &str, case_id: &str, event: &str) -> Result<(), String> {
        info!(tenant_id, case_id, event, "case notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_crown() {
        let catalog = StaticCatalog::with_defaults();
        let entry = catalog.lookup("crown").unwrap();
        assert_eq!(entry.stage_template.len(), 4);
        assert!(entry.estimated_lead_days > 0);
        assert!(catalog.lookup("veneer-of-doom").is_none());
    }
}
