//! Build engine access for buildprobe.
//!
//! - [`backend`]: the [`BuildEngine`](backend::BuildEngine) boundary and its
//!   Docker CLI and in-process fixture implementations.
//! - [`client`]: an explicitly opened and closed handle over one engine.
//! - [`logs`]: persistence of captured build logs for diagnosis.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod client;
pub mod logs;

pub use backend::{BuildEngine, BuildOptions, EngineKind};
pub use client::BuildClient;
