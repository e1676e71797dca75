// src/lib.rs

//! Job Aggregator Library
//!
//! Collects postings from search APIs and board scrapers, reconciles them
//! into a company/job store and merges near-duplicates after each run.

pub mod adapters;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
