//! JSON bridge between typed stages and external contexts.
//!
//! Context collaborators store records outside the process (a directory of
//! documents, a map of slots), so they need a way to turn stored JSON into a
//! stage's input type and a stage's results back into JSON. A [`JsonCodec`]
//! carries those two conversions as plain function pointers, monomorphized
//! when the stage is erased with [`Stage::into_json_dyn`].

use crate::error::{Boundary, PipelineError};
use crate::pipeline::{DynStage, Stage, TypeTag, Value};
use anyhow::{Context as _, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};

type DecodeFn = fn(serde_json::Value) -> anyhow::Result<Value>;
type EncodeFn = fn(&dyn Any) -> anyhow::Result<serde_json::Value>;

/// Optional JSON conversions for a stage's input and output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    decode: Option<DecodeFn>,
    encode: Option<EncodeFn>,
    decodes: Option<TypeTag>,
    encodes: Option<TypeTag>,
}

impl JsonCodec {
    /// Conversions for a stage from `In` to `Out`.
    pub fn of<In, Out>() -> Self
    where
        In: DeserializeOwned + 'static,
        Out: Serialize + 'static,
    {
        Self {
            decode: Some(decode_json::<In>),
            encode: Some(encode_json::<Out>),
            decodes: Some(TypeTag::of::<In>()),
            encodes: Some(TypeTag::of::<Out>()),
        }
    }

    /// Codec of `first` fused with `second`: decode like `first`, encode
    /// like `second`.
    pub fn chain(first: &Self, second: &Self) -> Self {
        Self {
            decode: first.decode,
            encode: second.encode,
            decodes: first.decodes,
            encodes: second.encodes,
        }
    }

    /// Type produced by the decoder, if there is one.
    pub fn input_type(&self) -> Option<TypeTag> {
        self.decodes
    }

    /// Type accepted by the encoder, if there is one.
    pub fn output_type(&self) -> Option<TypeTag> {
        self.encodes
    }

    /// Whether JSON can be turned into the stage's input.
    pub fn can_decode(&self) -> bool {
        self.decode.is_some()
    }

    /// Whether the stage's results can be turned into JSON.
    pub fn can_encode(&self) -> bool {
        self.encode.is_some()
    }

    /// Both directions are available.
    pub fn is_complete(&self) -> bool {
        self.can_decode() && self.can_encode()
    }

    /// Turn stored JSON into an erased stage input.
    ///
    /// # Errors
    ///
    /// Fails when no decoder is attached or the JSON does not fit the type.
    pub fn decode_input(&self, json: serde_json::Value) -> anyhow::Result<Value> {
        let decode = self
            .decode
            .ok_or_else(|| anyhow!("stage has no JSON decoder for its input"))?;
        decode(json)
    }

    /// Turn an erased stage result into JSON.
    ///
    /// # Errors
    ///
    /// Fails when no encoder is attached or the value has an unexpected type.
    pub fn encode_output(&self, value: &dyn Any) -> anyhow::Result<serde_json::Value> {
        let encode = self
            .encode
            .ok_or_else(|| anyhow!("stage has no JSON encoder for its output"))?;
        encode(value)
    }
}

fn decode_json<T: DeserializeOwned + 'static>(json: serde_json::Value) -> anyhow::Result<Value> {
    let value: T = serde_json::from_value(json)
        .with_context(|| format!("Failed to decode `{}` from JSON", type_name::<T>()))?;
    Ok(Box::new(value))
}

fn encode_json<T: Serialize + 'static>(value: &dyn Any) -> anyhow::Result<serde_json::Value> {
    let typed = value
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("expected a result of type `{}`", type_name::<T>()))?;
    serde_json::to_value(typed)
        .with_context(|| format!("Failed to encode `{}` as JSON", type_name::<T>()))
}

/// Check that `stage` carries a complete codec for its declared types.
///
/// Context collaborators call this when lifting a stage, so a stage that
/// cannot cross a JSON boundary is refused before anything runs.
///
/// # Errors
///
/// - [`PipelineError::MissingCodec`] when either direction is missing
/// - [`PipelineError::TypeMismatch`] when the codec converts other types
///   than the stage declares
pub fn require_codec(stage: &DynStage, position: usize) -> crate::error::Result<()> {
    let codec = stage.codec();
    let (Some(decodes), Some(encodes)) = (codec.input_type(), codec.output_type()) else {
        return Err(PipelineError::MissingCodec {
            stage: stage.name().to_owned(),
            position,
        });
    };

    let mismatch = |boundary, expected, found| PipelineError::TypeMismatch {
        stage: stage.name().to_owned(),
        position: Some(position),
        boundary,
        expected,
        found,
    };
    if decodes != stage.input_type() {
        return Err(mismatch(Boundary::Input, stage.input_type(), decodes));
    }
    if encodes != stage.output_type() {
        return Err(mismatch(Boundary::Output, stage.output_type(), encodes));
    }
    Ok(())
}

impl<In, Out> Stage<In, Out>
where
    In: DeserializeOwned + 'static,
    Out: Serialize + 'static,
{
    /// Erase the stage together with its JSON codec, so context
    /// collaborators can feed it stored records and persist its results.
    pub fn into_json_dyn(self) -> DynStage {
        self.into_dyn_with(JsonCodec::of::<In, Out>())
    }
}
