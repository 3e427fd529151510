//! Connection Management
//!
//! Models never own a database handle. They carry an optional
//! [`ConnectionResolver`] and ask it for a named [`Connection`] at the moment
//! a statement runs; without one, the process wide resolver is used.

pub mod manager;
pub mod resolver;

pub use manager::*;
pub use resolver::*;
