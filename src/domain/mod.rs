// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// The heart of the pipeline: pure Rust types and traits that
// define what the system works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain structs, enums, and traits
//
// Why keep this layer pure?
//   - Easy to unit test (no GPU, no tensors)
//   - Easy to understand (no framework noise)
//   - Easy to swap implementations (just implement the trait)
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The error taxonomy surfaced by every component
pub mod error;

// Sample block, split indices, dataset path
pub mod sample;

// Core abstractions (traits) that the data layer implements
pub mod traits;
