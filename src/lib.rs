// src/lib.rs

//! Listing scrapers for RE/MAX and ERA Portugal, plus a description vector index.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
