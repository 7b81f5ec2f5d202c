//! Binding a stage to an external context.
//!
//! A [`ContextAdapter`] decides where a stage's inputs come from and where
//! its results go; the provided [`ContextAdapter::run`] decides *when* each
//! hook is called. Concrete collaborators only implement the two hooks.

use crate::pipeline::{DynStage, Value};

/// Lazily generated, owned stage inputs.
///
/// The iterator must not borrow the context: `process_output` mutates it
/// while inputs are still being pulled.
pub type Inputs = Box<dyn Iterator<Item = anyhow::Result<Value>>>;

/// A stage together with its place in the pipeline.
#[derive(Debug, Clone)]
pub struct StageBinding {
    stage: DynStage,
    index: usize,
    count: usize,
}

impl StageBinding {
    /// Bind `stage` at `index` of `count` stages.
    pub fn new(stage: DynStage, index: usize, count: usize) -> Self {
        debug_assert!(index < count, "stage index {index} out of range for {count} stages");
        Self {
            stage,
            index,
            count,
        }
    }

    /// The bound stage.
    pub fn stage(&self) -> &DynStage {
        &self.stage
    }

    /// 0-based position of the stage.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of stages in the pipeline.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether this is the first stage.
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Whether this is the last stage.
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// A stage driven by, and reporting into, a context of type `C`.
pub trait ContextAdapter<C> {
    /// The stage this adapter drives.
    fn binding(&self) -> &StageBinding;

    /// Inputs for this stage, read from `context`.
    ///
    /// # Errors
    ///
    /// Any error is a hook failure and aborts the run.
    fn generate_inputs(&self, context: &C) -> anyhow::Result<Inputs>;

    /// Record one result of one input. `result_index` is 1-based and
    /// `result_count` is the size of that input's result batch.
    ///
    /// # Errors
    ///
    /// Any error is a hook failure and aborts the run.
    fn process_output(
        &mut self,
        context: &mut C,
        result: Value,
        result_index: usize,
        result_count: usize,
    ) -> anyhow::Result<()>;

    /// Run the stage against `context` and hand the context back.
    ///
    /// When the stage's `produce` yields anything, that batch is the whole
    /// output and `generate_inputs` is never called. Otherwise each
    /// generated input is run and its results recorded before the next input
    /// is pulled.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure unchanged.
    fn run(&mut self, mut context: C) -> anyhow::Result<C> {
        let stage = self.binding().stage().clone();
        let step = self.binding().index() + 1;

        let produced = stage.emit()?;
        if !produced.is_empty() {
            tracing::debug!(step, stage = stage.name(), results = produced.len(), "Stage produced its own inputs");
            deliver(self, &mut context, produced)?;
            return Ok(context);
        }

        let mut pulled = 0_usize;
        for input in self.generate_inputs(&context)? {
            let results = stage.run(input?)?;
            deliver(self, &mut context, results)?;
            pulled += 1;
        }
        tracing::debug!(step, stage = stage.name(), inputs = pulled, "Stage drained its inputs");

        Ok(context)
    }
}

fn deliver<C, A>(adapter: &mut A, context: &mut C, results: Vec<Value>) -> anyhow::Result<()>
where
    A: ContextAdapter<C> + ?Sized,
{
    let count = results.len();
    for (idx, result) in results.into_iter().enumerate() {
        adapter.process_output(context, result, idx + 1, count)?;
    }
    Ok(())
}
