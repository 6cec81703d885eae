//! Aggregation & insight engine.
//!
//! Stateless functions over an immutable snapshot of one user's records.
//! Nothing here touches the database or holds state between calls.

pub mod aggregate;
pub mod buckets;
pub mod correlation;
pub mod insights;
pub mod metrics;
