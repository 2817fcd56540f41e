//! Progressive Library - Step-by-step wizard engine
//!
//! This library provides:
//! - The wizard controller, step contract and navigation descriptors
//! - A UI-thread work queue and a background task bridge
//! - Per-session shared context
//! - String bundles and typed configuration
//! - The CSV import engine and the import wizard's pages

pub mod config;
pub mod context;
pub mod error;
pub mod i18n;
pub mod import;
pub mod task;
pub mod ui;

pub use error::{NavigationMiss, TaskError, WizardError};
