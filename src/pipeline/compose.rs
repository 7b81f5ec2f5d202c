//! Sequential fusion of two stages into one.
//!
//! The combined stage runs the first stage's full activation on its input and
//! the second stage's full activation on every result, so hooks fire depth
//! first: `a` before `b` before `c` per element, however the composition was
//! bracketed.

use super::dynamic::{DynStage, Value};
use super::stage::Stage;
use crate::codec::JsonCodec;
use crate::error::{Boundary, PipelineError, Result};
use std::rc::Rc;

impl<In: 'static, Mid: 'static> Stage<In, Mid> {
    /// Fuse `self` with `next`; the compiler checks that the types line up.
    ///
    /// The combined stage has no `produce` or `consume` of its own.
    pub fn then<Out: 'static>(self, next: Stage<Mid, Out>) -> Stage<In, Out> {
        let name = format!("{} >> {}", self.name(), next.name());

        Stage::map(move |input| {
            let mut results = Vec::new();
            for mid in self.run(input)? {
                results.extend(next.run(mid)?);
            }
            Ok(results)
        })
        .named(name)
    }
}

/// Fuse two erased stages, checking `first`'s output against `second`'s input.
///
/// # Errors
///
/// Returns [`PipelineError::TypeMismatch`] naming `second` when the types
/// disagree. Nothing runs in that case.
pub fn compose(first: DynStage, second: DynStage) -> Result<DynStage> {
    if first.output_type() != second.input_type() {
        return Err(PipelineError::TypeMismatch {
            stage: second.name().to_owned(),
            position: None,
            boundary: Boundary::Input,
            expected: first.output_type(),
            found: second.input_type(),
        });
    }

    let name = format!("{} >> {}", first.name(), second.name());
    let codec = JsonCodec::chain(first.codec(), second.codec());
    let input = first.input_type();
    let output = second.output_type();

    Ok(DynStage::from_parts(
        name,
        input,
        output,
        Rc::new(move |value: Value| -> anyhow::Result<Vec<Value>> {
            let mut results = Vec::new();
            for mid in first.run(value)? {
                results.extend(second.run(mid)?);
            }
            Ok(results)
        }),
        Rc::new(|| -> anyhow::Result<Vec<Value>> { Ok(Vec::new()) }),
        codec,
    ))
}
