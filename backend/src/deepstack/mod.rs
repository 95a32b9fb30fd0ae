//! Client for the remote DeepStack vision service.

pub mod client;
pub mod payload;

pub use client::{DeepstackClient, RemoteResponse};
pub use payload::extract_predictions;
