//! Kinds of the `canaries.flanksource.com/v1` API group.

pub mod canary;
pub mod common;
pub mod topology;

pub use canary::CanarySpec;
pub use topology::TopologySpec;
