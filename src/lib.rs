//! # stagewise - composable, type-checked processing pipelines
//!
//! A pipeline is an ordered chain of [`Stage`](pipeline::Stage)s. Each stage
//! takes one input and returns zero or more outputs; the pipeline feeds every
//! output of one stage into the next, so a single input can fan out into many
//! final results.
//!
//! ## Quick Start
//!
//! ```
//! use stagewise::pipeline::{Pipeline, Stage};
//!
//! let split = Stage::<String, String>::map(|line| {
//!     Ok(line.split_whitespace().map(str::to_owned).collect())
//! });
//! let measure = Stage::<String, usize>::map(|word| Ok(vec![word.len()]));
//!
//! let pipeline = Pipeline::<String, usize>::new(vec![split.into_dyn(), measure.into_dyn()])?;
//! assert_eq!(pipeline.run("to be or not".to_owned())?, vec![2, 2, 2, 3]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`pipeline`]: stages, type-checked chains, composition and in-memory runs
//! - [`context`]: running a pipeline against an external context
//!   - [`context::memory`]: named slots of JSON records
//!   - [`context::filesystem`]: one folder of JSON documents per stage
//! - [`codec`]: JSON conversions that let stages cross a context boundary
//! - [`library`]: ready-made console and JSON file sinks
//! - [`config`]: folder layout of filesystem contexts
//! - [`error`]: construction errors
//! - [`logging`]: subscriber setup for applications
//!
//! ## Errors
//!
//! Two kinds of failure are kept apart:
//!
//! - Building a pipeline, combined stage or contextual pipeline returns a
//!   [`PipelineError`](error::PipelineError) when stage types do not line up.
//!   Nothing runs.
//! - A failing hook returns an [`anyhow::Error`] that reaches the caller of
//!   `run` untouched, so it can be downcast to the hook's own error type.

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod library;
pub mod logging;
pub mod pipeline;
