//! Stage abstraction, type-checked composition and in-memory execution.
//!
//! # Overview
//!
//! - [`Stage`]: a unit with optional `produce`, `transform` and `consume` hooks
//! - [`DynStage`]: a type-erased stage that remembers its declared types
//! - [`validate_chain`]: checks that adjoining stages agree on their types
//! - [`Pipeline`]: a validated chain that fans one input out into many outputs
//! - [`compose`] / [`Stage::then`]: fuse two stages into one
//!
//! # Example
//!
//! ```
//! use stagewise::pipeline::{Pipeline, Stage};
//!
//! let pipeline = Pipeline::<i64, String>::new(vec![
//!     Stage::<i64, i64>::map(|x| Ok(vec![x, x + 1])).into_dyn(),
//!     Stage::<i64, String>::map(|x| Ok(vec![format!("#{x}")])).into_dyn(),
//! ])?;
//!
//! assert_eq!(pipeline.run(1)?, vec!["#1", "#2"]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod compose;
pub mod dynamic;
pub mod executor;
pub mod stage;
pub mod validation;

pub use compose::compose;
pub use dynamic::{DynStage, TypeTag, Value};
pub use executor::Pipeline;
pub use stage::Stage;
pub use validation::validate_chain;
