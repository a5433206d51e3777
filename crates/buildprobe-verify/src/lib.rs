//! # buildprobe-verify
//!
//! Verifies that an image build fails, and fails for the expected reason.
//!
//! Provides three main entry points:
//! - [`ExpectedFailure`](expectation::ExpectedFailure): The diagnostic a failing build must log.
//! - [`BuildFailureVerifier`](verifier::BuildFailureVerifier): Runs one build and judges its log.
//! - [`Suite`](suite::Suite): The negative scenarios run against a fixture tree.
//!
//! # Example
//!
//! ```rust,no_run
//! use buildprobe_common::config::ProbeConfig;
//! use buildprobe_common::types::BuildRequest;
//! use buildprobe_engine::{BuildClient, EngineKind};
//! use buildprobe_verify::expectation::ExpectedFailure;
//! use buildprobe_verify::verifier::BuildFailureVerifier;
//!
//! # fn main() -> buildprobe_common::error::Result<()> {
//! let config = ProbeConfig::default();
//! let client = BuildClient::connect(EngineKind::Docker, &config)?;
//! let request = BuildRequest::new("alternates/matlab-installer")
//!     .build_arg("MATLAB_RELEASE", "R2019b");
//! let expected = ExpectedFailure::contains("does not match release found in VersionInfo.xml");
//! BuildFailureVerifier::new(&client).verify(&request, &expected)?.ensure()?;
//! client.close()
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod expectation;
pub mod scenario;
pub mod suite;
pub mod verifier;
