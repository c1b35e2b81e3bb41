//! Unit tests for the chat domain types and in-memory adapters.
//!
//! Tests are organised by domain concept, covering happy paths, error cases,
//! and edge cases for all public APIs.

mod adapters_tests;
