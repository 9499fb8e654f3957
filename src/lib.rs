//! rangen library
//!
//! Core library for the rangen utility: uniform random integer generation
//! over inclusive ranges, plus durable, observable storage of named range
//! schemes.

pub mod app;
pub mod cli;
pub mod generator;
pub mod storage;
pub mod types;
