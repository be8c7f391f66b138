use pretty_assertions::assert_eq;
use ruleflow::{Data, Program, ProgramBuilder};

fn two_instruction_program() -> Program<i64> {
    ProgramBuilder::new()
        .rule("double", |n: i64| Ok(n * 2))
        .ret()
        .compile()
        .unwrap()
}

fn branching_program() -> Program<i64> {
    ProgramBuilder::new()
        .if_branch("positive", |n: &i64| Ok(*n > 0))
        .rule("double", |n: i64| Ok(n * 2))
        .or_else()
        .rule("negate", |n: i64| Ok(-n))
        .end_if()
        .ret()
        .compile()
        .unwrap()
}

fn calling_program() -> Program<String> {
    ProgramBuilder::new()
        .call("cleanup")
        .ret()
        .define("cleanup")
        .rule("strip", |s: String| Ok(s.trim().to_string()))
        .end_def()
        .compile()
        .unwrap()
}

/// Runs three positive and one negative payload through the program.
fn exercise(program: &mut Program<i64>) {
    for payload in [5, 2, 9, -1] {
        program.run(Data::new(payload)).unwrap();
    }
}

#[test]
fn test_text_listing_of_two_instructions() {
    let program = two_instruction_program();
    assert_eq!(
        program.to_text(false),
        "   0 double\n   1 RETURN\nEND OF MAIN PROGRAM"
    );
}

#[test]
fn test_text_listing_with_branch_comments() {
    let program = branching_program();
    let expected = "   0 positive
       # True  -> 1
       # False -> 2
   1 double
   2 negate
   3 RETURN
END OF MAIN PROGRAM";
    assert_eq!(program.to_text(false), expected);
}

#[test]
fn test_text_listing_with_statistics() {
    let mut program = branching_program();
    exercise(&mut program);

    let expected = "   0 positive
       # True  -> 1   (*3)
       # False -> 2   (*1)
   1 double   (*3)
   2 negate   (*1)
   3 RETURN   (*0)
END OF MAIN PROGRAM";
    assert_eq!(program.to_text(true), expected);
}

#[test]
fn test_text_listing_with_sub_program() {
    let program = calling_program();
    let expected = "   0 CALL (\"cleanup\")
   1 RETURN
END OF MAIN PROGRAM

DEF (\"cleanup\")
   2 strip
   3 RETURN
END # cleanup";
    assert_eq!(program.to_text(false), expected);
}

#[test]
fn test_dot_rendering() {
    let program = branching_program();
    let expected = r#"digraph {

compound = true;

subgraph "cluster_main" {
    node_0 [label="positive"];
    node_0 -> node_1 [label="True"];
    node_0 -> node_2 [label="False"];
    node_1 [label="double"];
    node_1 -> node_3;
    node_2 [label="negate"];
    node_2 -> node_3;
    node_3 [label="RETURN"];
}
}"#;
    assert_eq!(program.to_dot(false), expected);
}

#[test]
fn test_dot_rendering_with_statistics() {
    let mut program = branching_program();
    exercise(&mut program);

    let rendered = program.to_dot(true);
    assert!(rendered.contains(r#"    node_0 -> node_1 [label="True: 3"];"#));
    assert!(rendered.contains(r#"    node_0 -> node_2 [label="False: 1"];"#));
    assert!(rendered.contains(r#"    node_3 [label="RETURN: 0"];"#));
}

#[test]
fn test_dot_rendering_with_inter_cluster_edges() {
    let program = calling_program();
    let expected = r#"digraph {

compound = true;

subgraph "cluster_main" {
    node_0 [label="CALL (\"cleanup\")"];
    node_1 [label="RETURN"];
}

subgraph "cluster_cleanup" {
    label = "cleanup";

    node_2 [label="strip"];
    node_2 -> node_3;
    node_3 [label="RETURN"];
}

// inter-cluster-edges
    node_0 -> node_2;
    node_3 -> node_1;
}"#;
    assert_eq!(program.to_dot(false), expected);
}

#[test]
fn test_plain_renderings_ignore_statistics() {
    let mut program = branching_program();
    let text_before = program.to_text(false);
    let dot_before = program.to_dot(false);

    exercise(&mut program);

    assert_eq!(program.to_text(false), text_before);
    assert_eq!(program.to_dot(false), dot_before);
}
