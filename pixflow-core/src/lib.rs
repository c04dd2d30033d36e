#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod debug_log;
pub mod entities;
pub mod events;
pub mod framework;
pub mod gateway;
pub mod processors;
pub mod rates;
pub mod store;
