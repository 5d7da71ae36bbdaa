//! Data layer: record types, `.rs3` parsing, tables and per-site statistics.
//!
//! Architecture:
//! ```text
//!   base_dir/<Folder>/**/*.rs3
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ collector  │  walk tree → Folder → sorted file list
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │  loader    │  tokenize one file → NrmRow + Vec<ComponentRow>
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │  table     │  NRM_<Folder>.txt, Summary_Components_<Folder>.txt
//!   └───────────┘
//!        │  (re-read from disk)
//!        ├──────────────────────┐
//!        ▼                      ▼
//!   ┌───────────┐        ┌────────────┐
//!   │  sites     │        │ intensity   │  quartiles, ECDF, log bins
//!   └───────────┘        └────────────┘
//!     Mean_Int_*.txt          Hist_*.txt
//! ```

pub mod collector;
pub mod intensity;
pub mod loader;
pub mod model;
pub mod sites;
pub mod table;
