//! Adapter implementations for the federation ports.

pub mod http;
pub mod memory;
