//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the model runtime adapters and the image store.

pub mod inference;
pub mod storage;
