//! Domain layer for the playout orchestration engine.
//!
//! Everything in this crate is synchronous and free of I/O: the data model
//! shared by every other crate, the error taxonomy, and the pure algorithms
//! (rank interpolation, timeline transformation, running-order sorting)
//! that the engine composes inside its locked jobs.

pub mod clock;
pub mod error;
pub mod hashing;
pub mod ids;
pub mod ingest;
pub mod instance;
pub mod ordering;
pub mod playback;
pub mod playlist;
pub mod ranks;
pub mod rundown;
pub mod timeline;
pub mod types;
