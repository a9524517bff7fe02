//! Step definitions for backend federation BDD scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
