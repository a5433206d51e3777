//! # buildprobe-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the buildprobe workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the build request and build log primitives
//! that the engine, fixture, and verifier crates exchange.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
