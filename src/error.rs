//! Construction-time errors for stagewise pipelines.
//!
//! Stagewise separates two kinds of failure:
//!
//! ## Structural errors
//!
//! [`PipelineError`] is returned while a [`Pipeline`](crate::pipeline::Pipeline),
//! a composed stage or a [`ContextualPipeline`](crate::context::ContextualPipeline)
//! is being *built*. A value that failed to build never runs a single hook:
//!
//! ```
//! use stagewise::error::PipelineError;
//! use stagewise::pipeline::{Pipeline, Stage};
//!
//! let doubled = Stage::<i64, i64>::map(|x| Ok(vec![x * 2])).into_dyn();
//! let lengths = Stage::<String, i64>::map(|s| Ok(vec![s.len() as i64])).into_dyn();
//!
//! match Pipeline::<i64, i64>::new(vec![doubled, lengths]) {
//!     Err(PipelineError::TypeMismatch { position, .. }) => assert_eq!(position, Some(1)),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Hook failures
//!
//! Anything a `produce`, `transform`, `consume`, `generate_inputs` or
//! `process_output` hook returns is an [`anyhow::Error`] and reaches the
//! caller of `run` untouched, so the original error type can be recovered
//! with `downcast_ref`.

use crate::pipeline::TypeTag;
use std::fmt;

/// Which side of a stage a type check looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The type a stage accepts.
    Input,
    /// The type a stage emits.
    Output,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Main error type for building pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Adjoining declared types disagree.
    TypeMismatch {
        /// Name of the offending stage
        stage: String,
        /// 0-based position in the chain, `None` for a standalone composition
        position: Option<usize>,
        /// Side of the stage that was checked
        boundary: Boundary,
        /// Type required by the chain at this point
        expected: TypeTag,
        /// Type the stage declares
        found: TypeTag,
    },

    /// A chain was validated without a single stage.
    EmptyPipeline,

    /// A context collaborator needs to move values through JSON but the
    /// stage was erased without a codec.
    MissingCodec {
        /// Name of the offending stage
        stage: String,
        /// 0-based position in the pipeline
        position: usize,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                stage,
                position,
                boundary,
                expected,
                found,
            } => {
                if let Some(idx) = position {
                    write!(f, "Type mismatch at step {} `{stage}`: ", idx + 1)?;
                } else {
                    write!(f, "Type mismatch at `{stage}`: ")?;
                }
                write!(f, "{boundary} type `{found}` does not match `{expected}`")
            }
            Self::EmptyPipeline => write!(f, "A pipeline must have at least one stage"),
            Self::MissingCodec { stage, position } => write!(
                f,
                "Step {} `{stage}` has no JSON codec (erase it with `into_json_dyn`)",
                position + 1
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Result type alias for pipeline construction.
pub type Result<T> = std::result::Result<T, PipelineError>;
