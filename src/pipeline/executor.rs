//! Pipeline construction and in-memory execution.
//!
//! A [`Pipeline`] is validated once when it is built and never changes
//! afterwards. Running it expands a single input through every stage,
//! flattening each stage's outputs into the batch the next stage sees.

use super::dynamic::{DynStage, TypeTag, Value, downcast};
use super::stage::Stage;
use super::validation::validate_chain;
use crate::error::Result;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// An ordered, type-checked chain of stages from `In` to `Out`.
pub struct Pipeline<In, Out> {
    stages: Vec<DynStage>,
    _types: PhantomData<fn(In) -> Out>,
}

impl<In: Any, Out: Any> Pipeline<In, Out> {
    /// Build a pipeline, validating the declared type chain.
    ///
    /// An empty list is replaced by a single identity stage, which is only
    /// valid when `In` and `Out` are the same type.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TypeMismatch`](crate::error::PipelineError::TypeMismatch)
    /// for the first stage that breaks the chain.
    pub fn new(stages: Vec<DynStage>) -> Result<Self> {
        let stages = if stages.is_empty() {
            vec![Stage::<In, In>::identity().into_dyn()]
        } else {
            stages
        };

        validate_chain(TypeTag::of::<In>(), TypeTag::of::<Out>(), &stages)?;
        tracing::debug!(
            stages = stages.len(),
            input = std::any::type_name::<In>(),
            output = std::any::type_name::<Out>(),
            "Pipeline validated"
        );

        Ok(Self {
            stages,
            _types: PhantomData,
        })
    }

    /// Run every stage over the batch, starting from `[input]`.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure unchanged; later stages do not run.
    pub fn run(&self, input: In) -> anyhow::Result<Vec<Out>> {
        let mut batch: Vec<Value> = vec![Box::new(input)];

        for (idx, stage) in self.stages.iter().enumerate() {
            let mut next = Vec::with_capacity(batch.len());
            for item in batch {
                next.extend(stage.run(item)?);
            }
            tracing::debug!(step = idx + 1, stage = stage.name(), emitted = next.len(), "Stage applied");
            batch = next;
        }

        batch.into_iter().map(downcast::<Out>).collect()
    }
}

impl<In, Out> Pipeline<In, Out> {
    /// The validated stages, in order.
    pub fn stages(&self) -> &[DynStage] {
        &self.stages
    }

    /// Number of stages; never zero.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl<In, Out> fmt::Debug for Pipeline<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("input", &std::any::type_name::<In>())
            .field("output", &std::any::type_name::<Out>())
            .field("stages", &self.stages)
            .finish()
    }
}
