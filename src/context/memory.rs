//! Dictionary-style context: named slots of JSON records.
//!
//! Stage 0 reads the [`INITIAL_INPUTS`] slot; stage `k > 0` reads `stage_k`;
//! every stage appends its results to `stage_{k+1}`. Inspecting the slots
//! after a run shows what each stage emitted.

use super::adapter::{ContextAdapter, Inputs, StageBinding};
use super::contextual::{ContextualPipeline, Lift};
use crate::codec::require_codec;
use crate::error::Result;
use crate::pipeline::{DynStage, Pipeline, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slot read by the first stage.
pub const INITIAL_INPUTS: &str = "initial_inputs";

/// Name of the slot written by stage `index - 1` and read by stage `index`.
pub fn stage_slot(index: usize) -> String {
    format!("stage_{index}")
}

/// Ordered map of named record slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    slots: BTreeMap<String, Vec<serde_json::Value>>,
}

impl MemoryContext {
    /// Context with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the first stage's inputs.
    #[must_use]
    pub fn with_initial_inputs(self, inputs: impl IntoIterator<Item = serde_json::Value>) -> Self {
        self.with_slot(INITIAL_INPUTS, inputs)
    }

    /// Append `records` to the slot `name`.
    #[must_use]
    pub fn with_slot(
        mut self,
        name: impl Into<String>,
        records: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        self.slots
            .entry(name.into())
            .or_default()
            .extend(records);
        self
    }

    /// Records in `name`; empty when the slot was never written.
    pub fn slot(&self, name: &str) -> &[serde_json::Value] {
        self.slots.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `name` was ever written.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Append one record to `name`, creating the slot if needed.
    pub fn push(&mut self, name: impl Into<String>, record: serde_json::Value) {
        self.slots.entry(name.into()).or_default().push(record);
    }

    /// Names of all slots, in order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

/// Adapter reading and writing [`MemoryContext`] slots.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    binding: StageBinding,
}

impl ContextAdapter<MemoryContext> for MemoryAdapter {
    fn binding(&self) -> &StageBinding {
        &self.binding
    }

    fn generate_inputs(&self, context: &MemoryContext) -> anyhow::Result<Inputs> {
        let slot = if self.binding.is_first() {
            INITIAL_INPUTS.to_owned()
        } else {
            stage_slot(self.binding.index())
        };
        let codec = *self.binding.stage().codec();
        let records = context.slot(&slot).to_vec();

        Ok(Box::new(
            records
                .into_iter()
                .map(move |record| codec.decode_input(record)),
        ))
    }

    fn process_output(
        &mut self,
        context: &mut MemoryContext,
        result: Value,
        _result_index: usize,
        _result_count: usize,
    ) -> anyhow::Result<()> {
        let record = self.binding.stage().codec().encode_output(&*result)?;
        context.push(stage_slot(self.binding.index() + 1), record);
        Ok(())
    }
}

/// Factory for [`MemoryAdapter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryLift;

impl Lift<MemoryContext> for MemoryLift {
    type Adapter = MemoryAdapter;

    fn lift(&self, stage: &DynStage, stage_index: usize, stage_count: usize) -> Result<MemoryAdapter> {
        require_codec(stage, stage_index)?;
        Ok(MemoryAdapter {
            binding: StageBinding::new(stage.clone(), stage_index, stage_count),
        })
    }
}

/// A pipeline coupled to a [`MemoryContext`].
pub type MemoryPipeline = ContextualPipeline<MemoryContext, MemoryAdapter>;

/// Couple `pipeline` to `context`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingCodec`](crate::error::PipelineError::MissingCodec)
/// for a stage erased without `into_json_dyn`, or
/// [`PipelineError::TypeMismatch`](crate::error::PipelineError::TypeMismatch) when a stage's codec
/// converts other types than the stage declares.
pub fn coupled<In, Out>(pipeline: &Pipeline<In, Out>, context: MemoryContext) -> Result<MemoryPipeline> {
    ContextualPipeline::new(pipeline, context, &MemoryLift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::Stage;
    use serde_json::json;

    #[test]
    fn test_missing_slot_reads_empty() {
        let context = MemoryContext::new();
        assert!(context.slot("stage_3").is_empty());
        assert!(!context.contains("stage_3"));
    }

    #[test]
    fn test_with_slot_appends() {
        let context = MemoryContext::new()
            .with_slot("a", [json!(1)])
            .with_slot("a", [json!(2)]);
        assert_eq!(context.slot("a"), [json!(1), json!(2)]);
        assert_eq!(context.slot_names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_lift_requires_codec() {
        let pipeline = Pipeline::<i64, i64>::new(vec![Stage::<i64, i64>::identity().named("bare").into_dyn()]).unwrap();
        let err = coupled(&pipeline, MemoryContext::new()).err().unwrap();
        assert_eq!(
            err,
            PipelineError::MissingCodec {
                stage: "bare".to_owned(),
                position: 0
            }
        );
    }

    #[test]
    fn test_lift_rejects_codec_for_other_types() {
        use crate::codec::JsonCodec;
        use crate::error::Boundary;
        use crate::pipeline::TypeTag;

        let mislabelled = Stage::<i64, i64>::map(|x| Ok(vec![x]))
            .named("mislabelled")
            .into_dyn_with(JsonCodec::of::<String, String>());
        let pipeline = Pipeline::<i64, i64>::new(vec![
            Stage::<i64, i64>::identity().into_json_dyn(),
            mislabelled,
        ])
        .unwrap();

        let err = coupled(&pipeline, MemoryContext::new().with_initial_inputs([json!(1)]))
            .err()
            .unwrap();
        assert_eq!(
            err,
            PipelineError::TypeMismatch {
                stage: "mislabelled".to_owned(),
                position: Some(1),
                boundary: Boundary::Input,
                expected: TypeTag::of::<i64>(),
                found: TypeTag::of::<String>(),
            }
        );
    }

    #[test]
    fn test_stage_slots_are_written() {
        let pipeline = Pipeline::<i64, i64>::new(vec![
            Stage::<i64, i64>::map(|x| Ok(vec![x, -x])).into_json_dyn(),
        ])
        .unwrap();

        let context = coupled(&pipeline, MemoryContext::new().with_initial_inputs([json!(4)]))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(context.slot("stage_1"), [json!(4), json!(-4)]);
        assert_eq!(context.slot(INITIAL_INPUTS), [json!(4)]);
    }

    #[test]
    fn test_undecodable_record_fails_the_run() {
        let pipeline =
            Pipeline::<i64, i64>::new(vec![Stage::<i64, i64>::identity().into_json_dyn()]).unwrap();
        let err = coupled(&pipeline, MemoryContext::new().with_initial_inputs([json!("x")]))
            .unwrap()
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("i64"));
    }
}
