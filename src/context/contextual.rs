//! Running a whole pipeline against an external context.

use super::adapter::ContextAdapter;
use crate::error::Result;
use crate::pipeline::{DynStage, Pipeline};

/// Builds the adapter for one stage of a pipeline.
///
/// Closures of the shape `Fn(&DynStage, usize, usize) -> Result<A>` are
/// factories too.
pub trait Lift<C> {
    type Adapter: ContextAdapter<C>;

    /// Bind `stage` (at `stage_index` of `stage_count`) to the context.
    ///
    /// # Errors
    ///
    /// A factory may refuse a stage it cannot drive, e.g. one without the
    /// codec it needs.
    fn lift(&self, stage: &DynStage, stage_index: usize, stage_count: usize)
    -> Result<Self::Adapter>;
}

impl<C, A, F> Lift<C> for F
where
    A: ContextAdapter<C>,
    F: Fn(&DynStage, usize, usize) -> Result<A>,
{
    type Adapter = A;

    fn lift(&self, stage: &DynStage, stage_index: usize, stage_count: usize) -> Result<A> {
        self(stage, stage_index, stage_count)
    }
}

/// One adapter per pipeline stage, threading a single context through them.
///
/// There is no in-memory result batch: whatever the adapters wrote into the
/// context is the outcome of the run.
pub struct ContextualPipeline<C, A> {
    context: C,
    adapters: Vec<A>,
}

impl<C, A: ContextAdapter<C>> ContextualPipeline<C, A> {
    /// Lift every stage of `pipeline` with `lift`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the factory. Nothing runs.
    pub fn new<In, Out, L>(pipeline: &Pipeline<In, Out>, context: C, lift: &L) -> Result<Self>
    where
        L: Lift<C, Adapter = A>,
    {
        let count = pipeline.stage_count();
        let adapters = pipeline
            .stages()
            .iter()
            .enumerate()
            .map(|(idx, stage)| lift.lift(stage, idx, count))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { context, adapters })
    }

    /// The context the run will start from.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// One adapter per stage, in pipeline order.
    pub fn adapters(&self) -> &[A] {
        &self.adapters
    }

    /// Run the adapters one after another and return the final context.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure unchanged; later adapters do not run.
    pub fn run(self) -> anyhow::Result<C> {
        let Self {
            mut context,
            adapters,
        } = self;
        let total = adapters.len();

        tracing::info!(stages = total, "Contextual pipeline started");
        for mut adapter in adapters {
            let binding = adapter.binding();
            tracing::debug!(
                step = binding.index() + 1,
                of = binding.count(),
                stage = binding.stage().name(),
                "Running adapter"
            );
            context = adapter.run(context)?;
        }
        tracing::info!(stages = total, "Contextual pipeline finished");

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Inputs, StageBinding};
    use crate::error::PipelineError;
    use crate::pipeline::{Stage, Value};
    use anyhow::bail;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared ordered log: each stage appends results and reads what the
    /// previous stage appended.
    #[derive(Debug, Default)]
    struct Ledger {
        entries: Vec<(usize, i64)>,
        runs: Vec<usize>,
    }

    struct LedgerAdapter {
        binding: StageBinding,
    }

    impl ContextAdapter<Ledger> for LedgerAdapter {
        fn binding(&self) -> &StageBinding {
            &self.binding
        }

        fn generate_inputs(&self, context: &Ledger) -> anyhow::Result<Inputs> {
            let index = self.binding.index();
            let items: Vec<i64> = context
                .entries
                .iter()
                .filter(|(stage, _)| *stage == index)
                .map(|(_, value)| *value)
                .collect();
            Ok(Box::new(items.into_iter().map(|x| Ok(Box::new(x) as Value))))
        }

        fn process_output(
            &mut self,
            context: &mut Ledger,
            result: Value,
            _result_index: usize,
            _result_count: usize,
        ) -> anyhow::Result<()> {
            let Some(value) = result.downcast_ref::<i64>() else {
                bail!("unexpected result type");
            };
            context.runs.push(self.binding.index());
            context.entries.push((self.binding.index() + 1, *value));
            Ok(())
        }
    }

    fn lift_ledger(stage: &DynStage, index: usize, count: usize) -> Result<LedgerAdapter> {
        Ok(LedgerAdapter {
            binding: StageBinding::new(stage.clone(), index, count),
        })
    }

    #[test]
    fn test_second_adapter_sees_first_adapters_log() {
        let pipeline = Pipeline::<i64, i64>::new(vec![
            Stage::<i64, i64>::source(|| Ok(vec![3, 1, 2])).into_dyn(),
            Stage::<i64, i64>::map(|x| Ok(vec![x * 10])).into_dyn(),
        ])
        .unwrap();

        let contextual = ContextualPipeline::new(&pipeline, Ledger::default(), &lift_ledger).unwrap();
        assert_eq!(contextual.adapters().len(), 2);

        let ledger = contextual.run().unwrap();
        let second: Vec<i64> = ledger
            .entries
            .iter()
            .filter(|(stage, _)| *stage == 2)
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(second, vec![30, 10, 20]);
        assert_eq!(ledger.runs, vec![0, 0, 0, 1, 1, 1], "adapters run strictly in order");
    }

    #[test]
    fn test_lift_failure_is_reported_at_construction() {
        let pipeline = Pipeline::<i64, i64>::new(Vec::new()).unwrap();
        let refuse = |stage: &DynStage, index: usize, _count: usize| -> Result<LedgerAdapter> {
            Err(PipelineError::MissingCodec {
                stage: stage.name().to_owned(),
                position: index,
            })
        };

        let err = ContextualPipeline::new(&pipeline, Ledger::default(), &refuse)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingCodec { position: 0, .. }));
    }

    #[test]
    fn test_failing_adapter_stops_the_run() {
        let pipeline = Pipeline::<i64, i64>::new(vec![
            Stage::<i64, i64>::source(|| bail!("source offline")).into_dyn(),
            Stage::<i64, i64>::identity().into_dyn(),
        ])
        .unwrap();

        let contextual = ContextualPipeline::new(&pipeline, Ledger::default(), &lift_ledger).unwrap();
        let err = contextual.run().unwrap_err();
        assert_eq!(err.to_string(), "source offline");
    }

    /// Context handle whose journal outlives a failed run.
    #[derive(Debug, Clone, Default)]
    struct Journal(Rc<RefCell<Vec<String>>>);

    struct JournalAdapter {
        binding: StageBinding,
    }

    impl ContextAdapter<Journal> for JournalAdapter {
        fn binding(&self) -> &StageBinding {
            &self.binding
        }

        fn generate_inputs(&self, context: &Journal) -> anyhow::Result<Inputs> {
            let index = self.binding.index();
            context.0.borrow_mut().push(format!("pull {index}"));
            Ok(Box::new((1..=4_i64).map(|x| Ok(Box::new(x) as Value))))
        }

        fn process_output(
            &mut self,
            context: &mut Journal,
            result: Value,
            _result_index: usize,
            _result_count: usize,
        ) -> anyhow::Result<()> {
            let Some(value) = result.downcast_ref::<i64>() else {
                bail!("unexpected result type");
            };
            let index = self.binding.index();
            context.0.borrow_mut().push(format!("write {index}: {value}"));
            Ok(())
        }
    }

    #[test]
    fn test_failure_keeps_earlier_writes_and_skips_later_adapters() {
        let pipeline = Pipeline::<i64, i64>::new(vec![
            Stage::<i64, i64>::map(|x| {
                if x == 3 {
                    bail!("cannot handle {x}");
                }
                Ok(vec![x * 10])
            })
            .into_dyn(),
            Stage::<i64, i64>::identity().into_dyn(),
        ])
        .unwrap();
        let lift = |stage: &DynStage, index: usize, count: usize| -> Result<JournalAdapter> {
            Ok(JournalAdapter {
                binding: StageBinding::new(stage.clone(), index, count),
            })
        };
        let journal = Journal::default();

        let err = ContextualPipeline::new(&pipeline, journal.clone(), &lift)
            .unwrap()
            .run()
            .unwrap_err();

        assert_eq!(err.to_string(), "cannot handle 3");
        assert_eq!(
            *journal.0.borrow(),
            vec!["pull 0", "write 0: 10", "write 0: 20"],
            "Writes before the failure stay; the second adapter never runs"
        );
    }
}
