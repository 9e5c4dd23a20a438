//! Storage module for annotated images
//!
//! Writes segmentation overlays to a local directory that the HTTP layer
//! serves as static files.

mod image_store;

pub use image_store::{ImageStore, StorageError};
