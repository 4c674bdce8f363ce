//! Photobeam server library
//!
//! The broadcast core: a notification bus owning the live subscriber
//! set, per-connection subscriber sessions, and the HTTP surface that
//! wires both to the catalog and watcher crates. The binary in main.rs
//! is a thin argument-parsing shell over these pieces.

pub mod bus;
pub mod registry;
pub mod session;

pub use bus::{NotificationBus, Subscriber};
pub use registry::app;
