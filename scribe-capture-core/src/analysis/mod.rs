//! Real-time amplitude analysis over the live stream.

pub mod realtime;
