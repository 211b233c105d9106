//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn` against the server's own [`PlayoutEngine`],
//! so its work queues on the same playlist locks as requests do. All tasks
//! accept a [`CancellationToken`] for graceful shutdown.
//!
//! [`PlayoutEngine`]: onair_playout::PlayoutEngine
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod instance_cleanup;
