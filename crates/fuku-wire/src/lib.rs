#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Wire types and framing for the log socket: a client sends one
//! [`messages::SubscribeRequest`], then receives a [`messages::LogFrame`]
//! per line until it disconnects.

pub mod framing;
pub mod messages;

pub use framing::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use messages::{LogFrame, SubscribeRequest};
