//! Running pipelines against an external context.
//!
//! A plain [`Pipeline`](crate::pipeline::Pipeline) returns its results in
//! memory. A [`ContextualPipeline`] instead couples every stage to a shared
//! context through a [`ContextAdapter`]: each stage pulls its inputs from the
//! context and writes its results back, so the context is both the input and
//! the outcome of a run.
//!
//! Two contexts ship with the crate:
//!
//! - [`memory`]: named slots of JSON records, handy for tests and inspection
//! - [`filesystem`]: one folder of JSON documents per stage
//!
//! ```
//! use serde_json::json;
//! use stagewise::context::memory::{self, MemoryContext};
//! use stagewise::pipeline::{Pipeline, Stage};
//!
//! let pipeline = Pipeline::<i64, i64>::new(vec![
//!     Stage::<i64, i64>::map(|x| Ok(vec![x + 1])).into_json_dyn(),
//! ])?;
//! let context = memory::coupled(&pipeline, MemoryContext::new().with_initial_inputs([json!(1)]))?
//!     .run()?;
//! assert_eq!(context.slot("stage_1"), [json!(2)]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod adapter;
pub mod contextual;
pub mod filesystem;
pub mod memory;

pub use adapter::{ContextAdapter, Inputs, StageBinding};
pub use contextual::{ContextualPipeline, Lift};
pub use filesystem::{FileSystemAdapter, FileSystemContext, FileSystemLift, FileSystemPipeline};
pub use memory::{MemoryAdapter, MemoryContext, MemoryLift, MemoryPipeline};
