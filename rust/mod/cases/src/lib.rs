//! The Cases module — case production workflow engine.
//!
//! Tracks a manufacturing job (a dental prosthesis case) through an ordered
//! set of production stages, derives the case status from stage activity,
//! serves the Kanban board for manual moves, computes business-day
//! deadlines, and issues gap-free per-tenant case numbers.

pub mod api;
pub mod catalog;
pub mod model;
pub mod sla;
pub mod store;
pub mod workflow;

use std::sync::Arc;

use axum::Router;

use labdent_core::{Module, ServiceError};
use labdent_sql::SQLStore;

use catalog::{ClientDirectory, Notifier, ProsthesisCatalog};
use workflow::WorkflowEngine;

/// The Cases module. Embed this in a server binary to get the full case
/// workflow API.
pub struct CasesModule {
    engine: Arc<WorkflowEngine>,
}

impl CasesModule {
    /// Create the module and initialise storage.
    pub fn new(
        db: Arc<dyn SQLStore>,
        catalog: Arc<dyn ProsthesisCatalog>,
        directory: Arc<dyn ClientDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ServiceError> {
        let engine = Arc::new(WorkflowEngine::new(db, catalog, directory, notifier)?);
        Ok(Self { engine })
    }

    /// Get a reference to the engine for programmatic use.
    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }
}

impl Module for CasesModule {
    fn name(&self) -> &str {
        "cases"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.engine))
    }
}
