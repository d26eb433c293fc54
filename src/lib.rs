//! # Context Autocomplete
//!
//! A local context store and suggestion pipeline for a system-wide
//! autocomplete assistant.
//!
//! Observers record what the user reads and types into an append-only,
//! deduplicated SQLite log. When the trigger key fires, the pipeline slices
//! that log into a bounded context window, asks a language model for a few
//! ranked completions, shows them in an overlay, and injects the accepted
//! one into the focused field. The accepted text is recorded as context for
//! the next request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Observers  │──▶│ ContextStore │──▶│    slice     │
//! │ text/input  │   │   (SQLite)   │   │ (≤ N chars)  │
//! └─────────────┘   └──────▲───────┘   └──────┬───────┘
//!                          │                  ▼
//!   trigger ──▶ ┌──────────┴─────────┐   ┌──────────┐
//!   keys    ──▶ │ PipelineCoordinator│◀──│   LLM    │
//!               └──────────┬─────────┘   └──────────┘
//!                          ▼
//!                 overlay / injector
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ctxa init
//! ctxa add --app Safari "Rust 1.80 release notes"
//! ctxa slice Safari
//! ctxa suggest "Thanks for the" --app Mail
//! ctxa run --app Mail            # interactive pipeline over stdin
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed store and generation errors |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Context store: dedup, queries, pruning |
//! | [`slice`] | Two-tier context window |
//! | [`debounce`] | Trigger rate limiting |
//! | [`traits`] | Collaborator contracts |
//! | [`pipeline`] | Suggestion state machine and coordinator |
//! | [`generation`] | LLM-backed suggestion generator |
//! | [`console`] | Terminal collaborators for `ctxa run` |
//! | [`search`] | Read-side CLI commands |
//! | [`record`] | Write-side CLI commands |
//! | [`stats`] | Store statistics |
//! | [`session`] | `suggest` and `run` commands |

pub mod config;
pub mod console;
pub mod db;
pub mod debounce;
pub mod error;
pub mod generation;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod session;
pub mod slice;
pub mod stats;
pub mod store;
pub mod traits;
