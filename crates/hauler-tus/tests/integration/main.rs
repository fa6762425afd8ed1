//! Integration tests for the TUS protocol adapter
//!
//! Exercises the wire operations end-to-end against a wiremock server.

mod common;
mod test_config;
mod test_protocol;
