//! Unit tests for the clonekeeper CLI library
//!
//! These tests exercise the public library surface without contacting a
//! platform.

mod architecture;
