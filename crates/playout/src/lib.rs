//! The playout orchestration engine.
//!
//! Every mutating operation follows one discipline: take the playlist lock,
//! load a [`PlayoutCache`](onair_db::cache::PlayoutCache), run the
//! transition against the cache, regenerate the studio timeline, flush in
//! one commit and publish change events. [`PlayoutEngine`] is the facade
//! callers use.

pub mod blueprint;
pub mod config;
pub mod context;
pub mod engine;
pub mod ingest;
pub mod instances;
pub mod lock;
pub mod maintenance;
pub mod playout;
pub mod telemetry;
pub mod timeline;

pub use blueprint::{Blueprint, BlueprintContext, BlueprintError, DefaultBlueprint};
pub use config::PlayoutSettings;
pub use context::JobContext;
pub use engine::{InstanceView, PlayoutEngine, PlaylistView};
pub use lock::{JobId, LockKey, LockManager, LockPriority};
pub use maintenance::CleanupReport;
pub use playout::{ActivationMode, AdlibOutcome, NextTarget, ResetOptions, TakeOutcome};
pub use telemetry::ResolveLatency;
