//! Type-chain validation.
//!
//! Walks the declared stage types before anything runs, so a malformed chain
//! is rejected with the offending step instead of failing midway through a
//! batch.

use super::dynamic::{DynStage, TypeTag};
use crate::error::{Boundary, PipelineError, Result};

/// Validate that `stages` lead from `input` to `output`.
///
/// The running expectation starts at `input`; every stage must accept it and
/// replaces it with its own output type. What remains at the end must equal
/// `output`.
///
/// # Errors
///
/// - [`PipelineError::EmptyPipeline`] when `stages` is empty
/// - [`PipelineError::TypeMismatch`] for the first stage that breaks the chain
pub fn validate_chain(input: TypeTag, output: TypeTag, stages: &[DynStage]) -> Result<()> {
    let Some(last) = stages.last() else {
        return Err(PipelineError::EmptyPipeline);
    };

    let mut expected = input;
    for (idx, stage) in stages.iter().enumerate() {
        if stage.input_type() != expected {
            return Err(PipelineError::TypeMismatch {
                stage: stage.name().to_owned(),
                position: Some(idx),
                boundary: Boundary::Input,
                expected,
                found: stage.input_type(),
            });
        }
        expected = stage.output_type();
    }

    if expected != output {
        return Err(PipelineError::TypeMismatch {
            stage: last.name().to_owned(),
            position: Some(stages.len() - 1),
            boundary: Boundary::Output,
            expected: output,
            found: expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;

    fn int_to_string() -> DynStage {
        Stage::<i64, String>::map(|x| Ok(vec![x.to_string()]))
            .named("int_to_string")
            .into_dyn()
    }

    fn upper() -> DynStage {
        Stage::<String, String>::map(|s| Ok(vec![s.to_uppercase()]))
            .named("upper")
            .into_dyn()
    }

    #[test]
    fn test_validate_valid_chain() {
        let stages = vec![int_to_string(), upper()];
        assert!(validate_chain(TypeTag::of::<i64>(), TypeTag::of::<String>(), &stages).is_ok());
    }

    #[test]
    fn test_validate_empty_chain() {
        let err = validate_chain(TypeTag::of::<i64>(), TypeTag::of::<i64>(), &[]).unwrap_err();
        assert_eq!(err, PipelineError::EmptyPipeline);
    }

    #[test]
    fn test_validate_reports_first_broken_step() {
        let stages = vec![int_to_string(), int_to_string(), upper()];
        let err =
            validate_chain(TypeTag::of::<i64>(), TypeTag::of::<String>(), &stages).unwrap_err();

        assert_eq!(
            err,
            PipelineError::TypeMismatch {
                stage: "int_to_string".to_owned(),
                position: Some(1),
                boundary: Boundary::Input,
                expected: TypeTag::of::<String>(),
                found: TypeTag::of::<i64>(),
            }
        );
    }

    #[test]
    fn test_validate_declared_input() {
        let stages = vec![upper()];
        let err =
            validate_chain(TypeTag::of::<i64>(), TypeTag::of::<String>(), &stages).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::TypeMismatch {
                position: Some(0),
                boundary: Boundary::Input,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_declared_output() {
        let stages = vec![int_to_string()];
        let err =
            validate_chain(TypeTag::of::<i64>(), TypeTag::of::<i64>(), &stages).unwrap_err();

        assert!(err.to_string().contains("output type"));
        assert!(matches!(
            err,
            PipelineError::TypeMismatch {
                boundary: Boundary::Output,
                ..
            }
        ));
    }
}
