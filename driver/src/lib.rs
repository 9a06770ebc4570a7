//! Request-dispatch and event-distribution core of an 802.11 fullmac
//! driver: translates connectivity operations into vendor firmware
//! requests, dispatches them over a host-provided `Bus`/`MlanAdapter`, and
//! surfaces completions and unsolicited firmware events back to the OS
//! network stack.

pub mod client_connection;
pub mod config;
pub mod data_plane;
pub mod device;
pub mod event_handler;
mod firmware_events;
pub mod ifc;
pub mod ioctl;
pub mod key_ring;
pub mod logger;
pub mod scanner;
pub mod softap;
pub mod waitable;
mod worker;

#[cfg(test)]
mod mock;
