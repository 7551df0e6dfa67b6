//! # Survey Common Library
//!
//! Shared code for the survey service:
//! - Error type used by storage and configuration code
//! - Configuration loading and root folder resolution
//! - Database initialization for the `survey_responses` table

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
