//! Adapter implementations for the job service port.
//!
//! - `live/`: the proxy and Replicate over HTTP
//! - `recording/`: wrap a live adapter and write a cassette
//! - `replaying/`: answer from a cassette

pub mod live;
pub mod recording;
pub mod replaying;
