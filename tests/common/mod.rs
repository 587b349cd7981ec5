//! Shared test utilities for git-changes integration tests
//!
//! Every scenario runs against a real git repository in a temporary
//! directory, with config and store paths isolated per test.

pub mod assertions;
pub mod fixtures;
pub mod repository;
