//! The atomic processing unit of a pipeline.
//!
//! A [`Stage`] exposes up to three optional hooks:
//!
//! | Hook        | Signature              | Role                                   |
//! |-------------|------------------------|----------------------------------------|
//! | `produce`   | `() -> Vec<Out>`       | Source: emit records regardless of input |
//! | `transform` | `In -> Vec<Out>`       | Mapper: expand one input into 0..n outputs |
//! | `consume`   | `&Out -> ()`           | Sink: side effects on every result      |
//!
//! # Run contract
//!
//! For an input `i` the stage returns `produce() ++ transform(i)` when either
//! hook is present and `[i]` otherwise. `consume` then sees every result in
//! order and never changes what is returned.
//!
//! ```
//! use stagewise::pipeline::Stage;
//!
//! let stage = Stage::<i64, i64>::map(|x| Ok(vec![x * 10])).with_produce(|| Ok(vec![1, 2]));
//! assert_eq!(stage.run(5)?, vec![1, 2, 50]);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::any::type_name;

type ProduceFn<Out> = Box<dyn Fn() -> anyhow::Result<Vec<Out>>>;
type TransformFn<In, Out> = Box<dyn Fn(In) -> anyhow::Result<Vec<Out>>>;
type ConsumeFn<Out> = Box<dyn Fn(&Out) -> anyhow::Result<()>>;

/// A processing unit from `In` to zero or more `Out`.
///
/// Only `Stage<T, T>` can exist without a `produce` or `transform` hook, so
/// the identity fallback never has to convert between types.
pub struct Stage<In, Out> {
    name: String,
    produce: Option<ProduceFn<Out>>,
    transform: Option<TransformFn<In, Out>>,
    consume: Option<ConsumeFn<Out>>,
    passthrough: Option<fn(In) -> Out>,
}

impl<T> Stage<T, T> {
    /// A stage with no hooks: every input comes back unchanged.
    pub fn identity() -> Self {
        Self {
            name: format!("identity<{}>", type_name::<T>()),
            produce: None,
            transform: None,
            consume: None,
            passthrough: Some(std::convert::identity),
        }
    }

    /// A pass-through stage that hands every item to `consume`.
    pub fn sink(consume: impl Fn(&T) -> anyhow::Result<()> + 'static) -> Self {
        Self::identity().with_consume(consume)
    }
}

impl<In, Out> Stage<In, Out> {
    /// A source stage emitting `produce()` on every activation.
    pub fn source(produce: impl Fn() -> anyhow::Result<Vec<Out>> + 'static) -> Self {
        Self::bare().with_produce(produce)
    }

    /// A mapping stage expanding each input into zero or more outputs.
    pub fn map(transform: impl Fn(In) -> anyhow::Result<Vec<Out>> + 'static) -> Self {
        Self::bare().with_transform(transform)
    }

    fn bare() -> Self {
        Self {
            name: format!("{} -> {}", type_name::<In>(), type_name::<Out>()),
            produce: None,
            transform: None,
            consume: None,
            passthrough: None,
        }
    }

    /// Set the hook emitting records without an input.
    #[must_use]
    pub fn with_produce(mut self, produce: impl Fn() -> anyhow::Result<Vec<Out>> + 'static) -> Self {
        self.produce = Some(Box::new(produce));
        self
    }

    /// Set the hook expanding one input into results.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(In) -> anyhow::Result<Vec<Out>> + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Set the hook observing every result.
    #[must_use]
    pub fn with_consume(mut self, consume: impl Fn(&Out) -> anyhow::Result<()> + 'static) -> Self {
        self.consume = Some(Box::new(consume));
        self
    }

    /// Give the stage a name used in logs and type errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in logs and type errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a `produce` hook is set.
    pub fn has_produce(&self) -> bool {
        self.produce.is_some()
    }

    /// Whether a `transform` hook is set.
    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Whether a `consume` hook is set.
    pub fn has_consume(&self) -> bool {
        self.consume.is_some()
    }

    /// Apply the stage to one input.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `produce`, `transform` or `consume`,
    /// unchanged. Items consumed before the failure stay consumed.
    pub fn run(&self, input: In) -> anyhow::Result<Vec<Out>> {
        let results = if self.produce.is_none() && self.transform.is_none() {
            self.passthrough.map(|pass| vec![pass(input)]).unwrap_or_default()
        } else {
            let mut batch = self.produced()?;
            if let Some(transform) = &self.transform {
                batch.extend(transform(input)?);
            }
            batch
        };

        self.consume_all(&results)?;
        Ok(results)
    }

    /// Activate the stage with no input: `produce()` followed by `consume`.
    ///
    /// A stage without `produce` emits nothing.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `produce` or `consume`.
    pub fn emit(&self) -> anyhow::Result<Vec<Out>> {
        let results = self.produced()?;
        self.consume_all(&results)?;
        Ok(results)
    }

    fn produced(&self) -> anyhow::Result<Vec<Out>> {
        match &self.produce {
            Some(produce) => produce(),
            None => Ok(Vec::new()),
        }
    }

    fn consume_all(&self, results: &[Out]) -> anyhow::Result<()> {
        if let Some(consume) = &self.consume {
            for item in results {
                consume(item)?;
            }
        }
        Ok(())
    }
}

impl<In, Out> std::fmt::Debug for Stage<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("produce", &self.has_produce())
            .field("transform", &self.has_transform())
            .field("consume", &self.has_consume())
            .finish()
    }
}
