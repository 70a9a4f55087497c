#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Project generation and packaging for the build service
//!
//! This crate owns everything between validated web content and a native
//! executable:
//!
//! - [`ProjectMaterializer`] renders the project template and copies content
//!   and icon into it
//! - [`DependencyCache`] keeps one shared, hash-keyed install of the
//!   project's dependencies and hands out private copies
//! - [`BuildRunner`] runs the packager under time and output limits, then
//!   locates and publishes the produced executables

mod cache;
mod icon;
mod manifest;
mod materialize;
mod runner;
mod template;
mod toolchain;

pub use cache::{CacheHandle, DependencyCache, STAGING_PREFIX};
pub use icon::{IconAsset, IconFormat};
pub use manifest::DependencyManifest;
pub use materialize::{MaterializedProject, ProjectMaterializer};
pub use runner::BuildRunner;
pub use template::{ProjectTemplate, TemplateFile, TemplateValues, CONTENT_DIR, RESOURCES_DIR};
pub use toolchain::{exit_summary, ToolCommand};
