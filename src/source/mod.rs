//! Data sources: arbitration policy, loaders, and the network link.

pub mod arbiter;
pub mod link;
pub mod local;
pub mod provider;
pub mod remote;
