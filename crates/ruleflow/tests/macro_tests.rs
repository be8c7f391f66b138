//! Tests for the #[rule] / #[branch] / #[branch_rule] proc macros.

use ruleflow::{BodyError, Data, Progress, ProgramBuilder};
use ruleflow_macros::{branch, branch_rule, rule};

/// Doubles the payload.
#[rule]
fn double(payload: i64) -> Result<i64, BodyError> {
    Ok(payload * 2)
}

#[branch]
fn positive(payload: &i64) -> Result<bool, BodyError> {
    Ok(*payload > 0)
}

#[branch_rule]
fn halve_even(payload: i64) -> Result<Progress<i64>, BodyError> {
    if payload % 2 == 0 {
        Ok(Progress::Done(payload / 2))
    } else {
        Ok(Progress::NotDone(payload))
    }
}

#[rule(name = "to_zero")]
fn clamp(payload: i64) -> Result<i64, BodyError> {
    Ok(payload.min(0))
}

#[test]
fn test_annotated_function_stays_callable() {
    assert_eq!(double(21).unwrap(), 42);
    assert!(positive(&1).unwrap());
}

#[test]
fn test_generated_op_carries_the_function_name() {
    let program = ProgramBuilder::new()
        .op(double::op())
        .ret()
        .compile()
        .unwrap();
    assert_eq!(program.instruction(0).name(), "double");
}

#[test]
fn test_name_override() {
    let program = ProgramBuilder::new()
        .op(clamp::op())
        .ret()
        .compile()
        .unwrap();
    assert_eq!(program.instruction(0).name(), "to_zero");
}

#[test]
fn test_branch_op_as_condition() {
    let mut program = ProgramBuilder::new()
        .if_op(positive::op())
        .op(double::op())
        .end_if()
        .ret_true()
        .compile()
        .unwrap();

    let (item, _) = program.run(Data::new(4)).unwrap();
    assert_eq!(item.payload, 8);
    let (item, _) = program.run(Data::new(-4)).unwrap();
    assert_eq!(item.payload, -4);
}

#[test]
fn test_branch_rule_op() {
    let mut program = ProgramBuilder::new()
        .op(halve_even::op())
        .ret()
        .compile()
        .unwrap();

    let (item, flag) = program.run(Data::new(10)).unwrap();
    assert_eq!(item.payload, 5);
    assert!(flag);

    let (item, flag) = program.run(Data::new(9)).unwrap();
    assert_eq!(item.payload, 9);
    assert!(!flag);
}
