// src/models/mod.rs

//! Domain models for the aggregator.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod job;
mod session;
mod source;
mod store;

// Re-export all public types
pub use config::{
    AdzunaConfig, BackgroundConfig, Config, HttpConfig, JobrightConfig, LoggingConfig,
    PipelineConfig, ScrapeConfig,
};
pub use job::{
    EmploymentType, ExperienceLevel, JobRecord, PLACEHOLDER_DESCRIPTION_MARKER,
    PLACEHOLDER_TITLE_MARKER, SalaryRange,
};
pub use session::{
    ErrorKind, LogLevel, RunParams, Session, SessionCounters, SessionError, SessionLog,
    SessionStatus,
};
pub use source::{BoardSelectors, Region, SourceConfig, SourceId};
pub use store::{Company, CompanyDefaults, Job, JobDefaults, JobStatus, job_key};
