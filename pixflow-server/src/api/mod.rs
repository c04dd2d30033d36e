//! HTTP API.
//!
//! - `webhook`: DigitoPay callbacks, public
//! - `admin`: operator endpoints, `Pixflow-Admin-Authorization` required

pub mod admin;
pub mod extractors;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;
