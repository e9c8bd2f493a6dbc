//! Property-based tests for the region and commitment trees

mod commitment;
mod partition;
