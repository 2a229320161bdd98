//! Connection guidance for Ledger hardware wallets.
//!
//! The crate renders the instructions a user needs to connect a Ledger
//! device, either through the Ledger Live bridge or through direct HID
//! access, and keeps a small amount of shared state in step with what the
//! host can actually see: whether a Ledger is attached and whether a
//! transport to it could be created.

pub mod config;
pub mod error;
pub mod field;
pub mod hid;
pub mod i18n;
pub mod platform;
pub mod render;
pub mod state;
pub mod tracing;
pub mod transport;
pub mod types;
