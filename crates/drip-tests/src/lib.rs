//! Cross-crate test suite for Drip.
//!
//! Integration tests drive distributions through the factory against an
//! in-memory token ledger and check the accounting invariants end to end.

pub mod helpers;
