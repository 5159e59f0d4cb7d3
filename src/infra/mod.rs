// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence for experiment artifacts: the results.json record
// and the dumped model weights. Nothing here knows how training
// works; it only reads and writes what the orchestrator hands it.

/// Experiment record, training history and the results store
pub mod results;
