//! Core library: upload handling, classification, attribute extraction and
//! the catalog orchestration for the furniture album.

pub mod classifier;
pub mod config;
pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod uploads;
