//! Fail-fast bootstrap orchestrator for a single-container service.
//!
//! This crate models the build-and-run sequence that turns a source checkout
//! into a running bound service: provision the OS environment, create a
//! non-root identity, install the server and client dependency sets, build
//! the client, launch the server. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (planning, manifests, invariants).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (process execution, config, layout,
//!   launch). Isolated to enable mocking in tests.
//!
//! Orchestration modules ([`pipeline`], [`validate`]) coordinate core logic
//! with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
