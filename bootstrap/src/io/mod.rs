//! Side-effecting operations: process execution, config, layout, artifacts,
//! service launch. Isolated from core logic to enable mocking in tests.

pub mod artifacts;
pub mod config;
pub mod launch;
pub mod layout;
pub mod process;
pub mod runner;
