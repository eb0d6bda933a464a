//! # Paperlift
//!
//! Front-matter metadata extraction for document collections.
//!
//! Paperlift reads the leading pages of each document, asks a local
//! text-generation model (Ollama) for title, authors, year, abstract,
//! keywords and categories, recovers a JSON object from whatever the model
//! returns, and persists one normalized record per document keyed by the
//! SHA-256 of its bytes.
//!
//! ## Architecture
//!
//! ```text
//! discover ─▶ slice ─▶ prompt ─▶ generate ─▶ parse ─▶ normalize ─▶ store
//!  (glob)    (pages)            (retry)                          json/ logs/ index.jsonl
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! paperlift list                       # show discovered documents
//! paperlift slice data/paper.pdf       # inspect the excerpt sent to the model
//! paperlift run --dry-run              # slice everything, call nothing
//! paperlift run                        # full extraction
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Records and on-disk artifact shapes |
//! | [`document`] | Paginated document loading and content hash |
//! | [`discover`] | Glob-based input discovery |
//! | [`slice`] | Front-matter excerpt selection |
//! | [`prompt`] | Instruction template |
//! | [`generate`] | Generation backend and retrying call |
//! | [`parse`] | JSON recovery from model output |
//! | [`normalize`] | Best-effort schema coercion |
//! | [`store`] | Artifact writers |
//! | [`pipeline`] | Run orchestration |
//! | [`progress`] | Progress reporting |

pub mod config;
pub mod discover;
pub mod document;
pub mod error;
pub mod generate;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod slice;
pub mod store;
