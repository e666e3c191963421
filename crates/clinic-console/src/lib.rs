#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Resilient collection loading for the clinic records console.
//!
//! One generic controller replaces a list view per resource kind: it races
//! each fetch against a watchdog, normalises the payload envelope, keeps a
//! text filter and a selection set consistent, and gates bulk actions on the
//! selection.
//!
//! Layout:
//! - `api.rs`: `ResourceApi` seam and the `reqwest` implementation.
//! - `config.rs`: timeouts, per-kind profiles, validation.
//! - `cycle.rs`: load tickets, generations and load state.
//! - `watchdog.rs`: single-shot request deadline.
//! - `normalize.rs`: list envelope detection and record decoding.
//! - `filter.rs` / `selection.rs`: visible subset and selection set.
//! - `collection.rs`: pure state transitions for one kind.
//! - `controller.rs` / `gate.rs`: async controller and bulk action gate.
//! - `editor.rs` / `board.rs`: form view and treatment board.

pub mod api;
pub mod board;
pub mod collection;
pub mod config;
pub mod controller;
pub mod cycle;
pub mod editor;
pub mod error;
pub mod filter;
pub mod gate;
pub mod normalize;
pub mod selection;
pub mod watchdog;

pub use api::{HttpApi, RawResponse, ResourceApi};
pub use board::{TreatmentBoard, TreatmentRow};
pub use collection::CollectionState;
pub use config::{ApiTimeouts, ConsoleConfig, KindProfile, TimeoutPolicy};
pub use controller::CollectionController;
pub use cycle::{LoadState, LoadTicket, SettleOutcome, Settlement};
pub use editor::{EditorMode, RecordEditor};
pub use error::{ConsoleError, EditorError, FetchError, GateNotice, LoadFailure};
pub use gate::{Confirm, Dispatch};
pub use normalize::{PayloadShape, normalize, normalize_records};
pub use watchdog::{Raced, Watchdog};
