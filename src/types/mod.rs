//! Shared type definitions
//!
//! Data types shared between the storage layer and the presentation layer.

pub mod scheme;
