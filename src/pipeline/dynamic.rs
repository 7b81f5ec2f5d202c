//! Type-erased stages for dynamically assembled chains.
//!
//! A [`Stage<In, Out>`](super::Stage) is checked by the compiler, but a
//! pipeline is a list of stages with *different* type parameters. Erasing a
//! stage into a [`DynStage`] keeps its declared types as [`TypeTag`]s so the
//! chain can be checked once at construction time instead.

use super::stage::Stage;
use crate::codec::JsonCodec;
use anyhow::anyhow;
use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// An erased value travelling between stages.
pub type Value = Box<dyn Any>;

type RunFn = Rc<dyn Fn(Value) -> anyhow::Result<Vec<Value>>>;
type EmitFn = Rc<dyn Fn() -> anyhow::Result<Vec<Value>>>;

/// Runtime identity of a declared stage type.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Identity used for comparisons.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name, for messages only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A stage whose input and output types are only known at runtime.
///
/// Cloning is cheap: the hooks are shared, not duplicated.
#[derive(Clone)]
pub struct DynStage {
    name: String,
    input: TypeTag,
    output: TypeTag,
    run: RunFn,
    emit: EmitFn,
    codec: JsonCodec,
}

impl DynStage {
    pub(crate) fn from_parts(
        name: String,
        input: TypeTag,
        output: TypeTag,
        run: RunFn,
        emit: EmitFn,
        codec: JsonCodec,
    ) -> Self {
        Self {
            name,
            input,
            output,
            run,
            emit,
            codec,
        }
    }

    /// Name of the erased stage.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input type.
    pub fn input_type(&self) -> TypeTag {
        self.input
    }

    /// Declared output type.
    pub fn output_type(&self) -> TypeTag {
        self.output
    }

    /// JSON conversions used by context collaborators.
    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Run the full activation on one erased input.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure, or an error if `input` is not of the
    /// declared input type.
    pub fn run(&self, input: Value) -> anyhow::Result<Vec<Value>> {
        (self.run)(input)
    }

    /// Activate the stage without an input (produce, then consume).
    ///
    /// # Errors
    ///
    /// Returns the first hook failure.
    pub fn emit(&self) -> anyhow::Result<Vec<Value>> {
        (self.emit)()
    }
}

impl fmt::Debug for DynStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynStage")
            .field("name", &self.name)
            .field("input", &self.input.name())
            .field("output", &self.output.name())
            .finish_non_exhaustive()
    }
}

impl<In: Any, Out: Any> Stage<In, Out> {
    /// Erase the stage so it can sit in a [`Pipeline`](super::Pipeline).
    pub fn into_dyn(self) -> DynStage {
        self.into_dyn_with(JsonCodec::default())
    }

    pub(crate) fn into_dyn_with(self, codec: JsonCodec) -> DynStage {
        let name = self.name().to_owned();
        let stage = Rc::new(self);
        let runner = Rc::clone(&stage);

        DynStage::from_parts(
            name,
            TypeTag::of::<In>(),
            TypeTag::of::<Out>(),
            Rc::new(move |value: Value| -> anyhow::Result<Vec<Value>> {
                Ok(box_all(runner.run(downcast::<In>(value)?)?))
            }),
            Rc::new(move || -> anyhow::Result<Vec<Value>> { Ok(box_all(stage.emit()?)) }),
            codec,
        )
    }
}

/// Unbox an erased value into its concrete type.
pub(crate) fn downcast<T: Any>(value: Value) -> anyhow::Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("expected a value of type `{}`", std::any::type_name::<T>()))
}

fn box_all<T: Any>(values: Vec<T>) -> Vec<Value> {
    values
        .into_iter()
        .map(|value| Box::new(value) as Value)
        .collect()
}
