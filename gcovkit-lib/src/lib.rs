#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for gcovkit
//!
//! This library consolidates all functionality for the gcovkit tool, which produces
//! gcov-compatible coverage reports from compiler notes files (`.gcno`) and run-time
//! data files (`.gcda`).
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and the per-source driver loop
//! - [`pipeline`]: Companion-file resolution, loading, and validation
//! - [`gcov`]: Reader for the gcov notes and data formats
//! - [`reports`]: Option model and `.gcov` report rendering

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod gcov;
#[cfg(not(any(debug_assertions, test)))]
mod gcov;

#[cfg(any(debug_assertions, test))]
pub mod pipeline;
#[cfg(not(any(debug_assertions, test)))]
mod pipeline;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::commands::{Host, run};
