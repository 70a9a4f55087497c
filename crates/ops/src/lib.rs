#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build orchestration for webforge
//!
//! This crate wires the pipeline stages together. [`BuildService`] is the
//! entry point: it validates submissions, registers them with the status
//! tracker and hands them to the [`Coordinator`], which runs one task per
//! build. [`RetentionSweeper`] reclaims expired workspaces and outputs on its
//! own schedule.

mod context;
mod coordinator;
mod pipeline;
mod service;
mod sweeper;

pub use context::{OpsContextBuilder, OpsCtx, WorkspaceLayout};
pub use coordinator::Coordinator;
pub use pipeline::{run_pipeline, BuildJob, DOWNLOAD_PREFIX};
pub use service::{BuildService, SubmitRequest};
pub use sweeper::{RetentionSweeper, SweeperHandle};
