//! Shared protocol definitions for the Leaseline real-time channel.

pub mod event;
