//! Leaseline presence service library.
//!
//! Exposes the WebSocket server for use in tests and embedding. The service
//! tracks which platform user is live on which connection and relays direct
//! chat messages between owners and tenants.

pub mod config;
pub mod registry;
pub mod relay;
