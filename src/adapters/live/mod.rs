//! Live adapters that talk to real HTTP services.

pub mod proxy;
pub mod replicate;
