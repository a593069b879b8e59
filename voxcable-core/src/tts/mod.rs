//! Speech synthesis backends

pub mod edge;
pub mod espeak;
pub mod provider;
pub mod types;
