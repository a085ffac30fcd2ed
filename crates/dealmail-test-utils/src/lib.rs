// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Dealmail integration tests.
//!
//! Provides in-memory collaborators and a harness for fast, deterministic
//! tests without a mail provider or a shared database.
//!
//! # Components
//!
//! - [`MemoryStore`] - Queue and sent ledger in memory, with failure injection
//! - [`MockTransport`] - Mail transport with scripted replies per recipient
//! - [`CandidateBuilder`] / [`MemoryCandidates`] - Candidate fixtures
//! - [`TestHarness`] - Temp SQLite store, mock transport, and config together

pub mod candidates;
pub mod harness;
pub mod memory_store;
pub mod mock_transport;

pub use candidates::{CandidateBuilder, MemoryCandidates, eligible_candidates};
pub use harness::{TEST_CAMPAIGN, TEST_PRICE, TestHarness, TestHarnessBuilder, test_config};
pub use memory_store::MemoryStore;
pub use mock_transport::{MockReply, MockTransport};
