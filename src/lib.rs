//! Relay a single UDP media stream to many WebRTC peers
//!
//! Peers join through a one-shot WebSocket offer/answer exchange
//! ([`signaling`]); the media server ([`server`]) copies each inbound
//! datagram to every active session held by the [`session`] registry.

pub mod config;
pub mod server;
pub mod session;
pub mod signaling;
pub mod transport;
