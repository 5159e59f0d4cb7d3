// ============================================================
// Layer 2 — Application Layer
// ============================================================
// Use cases that wire the lower layers together. The CLI calls
// in here; nothing in here knows about clap.

/// End-to-end training orchestration and its configuration record
pub mod train_use_case;
