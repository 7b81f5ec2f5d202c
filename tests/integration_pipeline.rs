//! Integration tests for stage chains run in memory
//!
//! These tests build pipelines through the public API only and check the
//! ordering and typing guarantees end to end.

use stagewise::error::{Boundary, PipelineError};
use stagewise::pipeline::{Pipeline, Stage, TypeTag, compose};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn logged(log: &Log, label: &'static str, factor: i64) -> Stage<i64, i64> {
    let sink = Rc::clone(log);
    Stage::<i64, i64>::map(move |x| Ok(vec![x * factor, x * factor + 1]))
        .with_consume(move |y| {
            sink.borrow_mut().push(format!("{label}:{y}"));
            Ok(())
        })
        .named(label)
}

#[test]
fn test_identity_returns_the_input() {
    let stage = Stage::<String, String>::identity();
    assert_eq!(stage.run("x".to_owned()).unwrap(), vec!["x"]);

    let erased = Stage::<i64, i64>::identity().into_dyn();
    let out = erased.run(Box::new(7_i64)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].downcast_ref::<i64>(), Some(&7));
}

#[test]
fn test_fan_out_order() {
    let pipeline = Pipeline::<i64, i64>::new(vec![
        Stage::<i64, i64>::map(|x| Ok(vec![x, x])).into_dyn(),
        Stage::<i64, i64>::map(|y| Ok(vec![y])).into_dyn(),
    ])
    .unwrap();

    assert_eq!(pipeline.run(5).unwrap(), vec![5, 5]);
}

#[test]
fn test_produce_precedes_transform() {
    let stage = Stage::<i64, i64>::source(|| Ok(vec![1, 2])).with_transform(|x| Ok(vec![x * 10]));
    assert_eq!(stage.run(5).unwrap(), vec![1, 2, 50]);
}

#[test]
fn test_type_errors_surface_before_any_stage_runs() {
    let log: Log = Rc::default();
    let first = logged(&log, "first", 1).into_dyn();
    let second = Stage::<String, i64>::map(|s| Ok(vec![i64::try_from(s.len())?]))
        .named("measure")
        .into_dyn();

    let err = Pipeline::<i64, i64>::new(vec![first, second]).unwrap_err();

    assert_eq!(
        err,
        PipelineError::TypeMismatch {
            stage: "measure".to_owned(),
            position: Some(1),
            boundary: Boundary::Input,
            expected: TypeTag::of::<i64>(),
            found: TypeTag::of::<String>(),
        }
    );
    assert!(log.borrow().is_empty(), "No consume side effects may be recorded");
}

#[test]
fn test_composition_is_associative() {
    let left_log: Log = Rc::default();
    let right_log: Log = Rc::default();

    let left = compose(
        compose(
            logged(&left_log, "a", 1).into_dyn(),
            logged(&left_log, "b", 10).into_dyn(),
        )
        .unwrap(),
        logged(&left_log, "c", 100).into_dyn(),
    )
    .unwrap();
    let right = compose(
        logged(&right_log, "a", 1).into_dyn(),
        compose(
            logged(&right_log, "b", 10).into_dyn(),
            logged(&right_log, "c", 100).into_dyn(),
        )
        .unwrap(),
    )
    .unwrap();

    let collect = |values: Vec<Box<dyn std::any::Any>>| -> Vec<i64> {
        values
            .into_iter()
            .map(|v| *v.downcast::<i64>().unwrap())
            .collect()
    };
    let from_left = collect(left.run(Box::new(2_i64)).unwrap());
    let from_right = collect(right.run(Box::new(2_i64)).unwrap());

    assert_eq!(from_left, from_right);
    assert_eq!(from_left.len(), 8, "Three binary fan-outs give eight results");
    assert_eq!(*left_log.borrow(), *right_log.borrow(), "Side effects happen in the same order");
}

#[test]
fn test_typed_then_matches_erased_compose() {
    let typed = Stage::<i64, i64>::map(|x| Ok(vec![x + 1]))
        .then(Stage::<i64, String>::map(|x| Ok(vec![x.to_string(), format!("{x}!")])));
    assert_eq!(typed.run(1).unwrap(), vec!["2", "2!"]);

    let erased = compose(
        Stage::<i64, i64>::map(|x| Ok(vec![x + 1])).into_dyn(),
        Stage::<i64, String>::map(|x| Ok(vec![x.to_string(), format!("{x}!")])).into_dyn(),
    )
    .unwrap();
    assert_eq!(erased.input_type(), TypeTag::of::<i64>());
    assert_eq!(erased.output_type(), TypeTag::of::<String>());

    let pipeline = Pipeline::<i64, String>::new(vec![erased]).unwrap();
    assert_eq!(pipeline.run(1).unwrap(), vec!["2", "2!"]);
}

#[test]
fn test_hook_error_reaches_the_caller_unchanged() {
    #[derive(Debug, PartialEq)]
    struct Rejected(i64);

    impl std::fmt::Display for Rejected {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "rejected {}", self.0)
        }
    }

    impl std::error::Error for Rejected {}

    let pipeline = Pipeline::<i64, i64>::new(vec![
        Stage::<i64, i64>::map(|x| Ok(vec![x, x + 1])).into_dyn(),
        Stage::<i64, i64>::map(|x| {
            if x % 2 == 0 {
                Ok(vec![x])
            } else {
                Err(Rejected(x).into())
            }
        })
        .into_dyn(),
    ])
    .unwrap();

    let err = pipeline.run(4).unwrap_err();
    assert_eq!(err.downcast_ref::<Rejected>(), Some(&Rejected(5)));
}
