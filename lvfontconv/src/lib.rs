//! Converting font files into LVGL bitmap fonts
//!
//! The binary is a thin layer over this library: it builds [`Job`]s from
//! command line flags or [project files](project::Project) and runs them.

#![forbid(unsafe_code)]

mod error;
pub mod job;
pub mod project;
pub mod range;
pub mod raster;

pub use error::CliError;
pub use job::{write_atomic, Job, JobFont, JobSummary};
pub use project::Project;
