// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # verifier
//!
//! Checks that a translated network computes what the source framework
//! computed.
//!
//! - [`Verifier`] compares named tensors from two [`TensorSource`]s after
//!   normalizing both by the computed tensor's maximum.
//! - [`FixtureDir`] serves `{name}_dump.npy` reference arrays; the
//!   [`npy`] module reads and writes them.
//! - [`verify_fixtures`] drives load → translate → run → verify for a
//!   [`runtime::RunConfig`], and skips cleanly when fixtures are absent.

mod error;
mod fixtures;
pub mod npy;
mod source;
mod verify;

pub use error::VerifyError;
pub use fixtures::{dump_tensors, output_source_names, verify_fixtures, FixtureOutcome, INPUT_FIXTURE};
pub use source::{FixtureDir, TensorSource};
pub use verify::{
    normalization_scale, Mismatch, Side, TensorCheck, VerificationReport, Verifier, DEFAULT_DECIMAL,
};
