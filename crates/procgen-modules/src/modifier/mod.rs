//! Modifiers: rework the entries of an upstream module

pub mod jitter;

pub use jitter::JitterGenerator;
