//! Client-side network adapter for the doodle fight relay.
//!
//! [`connection::NetworkAdapter`] owns the WebSocket and its reconnect
//! policy; [`peers::PeerView`] turns its events into remote-player proxies for
//! whatever draws them.

pub mod config;
pub mod connection;
pub mod peers;
pub mod reconnect;
