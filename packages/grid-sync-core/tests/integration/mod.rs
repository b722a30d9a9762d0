//! Integration test suite.
//!
//! 1. Change-set properties against a memory table
//! 2. Table-file flow with freshness waiting
//! 3. SQL store statement flow
//! 4. Consistency waiter timing

pub mod consistency_tests;
pub mod diff_properties;
pub mod file_flow;
pub mod helpers;
pub mod sql_flow;
