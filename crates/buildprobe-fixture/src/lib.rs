//! # buildprobe-fixture
//!
//! Access to the fixture tree a probe image is built from.
//!
//! Handles:
//! - **Tree**: Locating the Dockerfile and mocked installation payload.
//! - **Version info**: Reading and writing the release recorded in `VersionInfo.xml`.
//! - **Trigger**: Writing the `FAIL` trigger file under a guard that removes it on drop.
//! - **Scaffold**: Generating a minimal buildable fixture tree.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod scaffold;
pub mod tree;
pub mod trigger;
pub mod version_info;

pub use tree::FixtureTree;
pub use trigger::TriggerGuard;
