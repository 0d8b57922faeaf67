//! HTTP request handlers
//!
//! Author: hephaex@gmail.com

pub mod health;
pub mod rest;

pub use health::{health_check, metrics, readiness_check};
pub use rest::rest_handler;
