//! Shared wire types for pixflow.
//!
//! This crate carries everything that crosses a process boundary: the
//! DigitoPay gateway payloads, the inbound webhook body, the admin API
//! objects, and the HMAC signature scheme. The `client` feature adds a
//! typed [`client::AdminClient`] for operator tooling.

pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;
