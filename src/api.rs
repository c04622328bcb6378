//! HTTP API for the debate floor
//!
//! Administrative motion routes sit behind an [`AccessGate`]; display routes
//! are open to the floor screen.

mod gate;
mod handlers;
mod types;

pub use gate::{AccessGate, BearerTokenGate};
pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::floor::FloorEngine;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: FloorEngine,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    pub fn new(engine: FloorEngine, gate: Arc<dyn AccessGate>) -> Self {
        Self { engine, gate }
    }
}
