// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw dataset files and tensor batches.
//
// The pipeline flows in this order:
//
//   dataset files (JSON blob / MAT frames)
//       │
//       ▼
//   registry          → picks the dataset kind by name
//       │
//       ▼
//   RadioMl2016 /     → load raw files into the N×T×2 block,
//   MatlabV2            labels and per-sample SNRs
//       │
//       ▼
//   splitter          → seeded train/val/test index partition
//       │
//       ▼
//   FrameDataset      → one split, as Burn's Dataset trait
//       │
//       ▼
//   FrameBatcher      → stacks frames into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Shared load/split state and the Burn Dataset adapter
pub mod dataset;

/// RadioML 2016 blob loader
pub mod radioml;

/// MATLAB per-class frame-file loader
pub mod matlab_v2;

/// Dataset name -> constructor dispatch
pub mod registry;

/// Seeded three-way index partition
pub mod splitter;

/// Stacks IQ frames into tensor batches
pub mod batcher;
