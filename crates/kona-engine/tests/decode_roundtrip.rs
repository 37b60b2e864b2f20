//! Decoding whole programs and printing them back

use kona_engine::parser::DumpReader;
use kona_engine::{decode, DecodeError, NodeKind};

const PROGRAM: &str = r#"Block
  Comment
  Assign
    Value "square"
    Code
      Param "x"
      Block
        Op *
          Value "x"
          Value "x"
  Assign
    Value
      Obj
        Value "value1"
        Assign
          Value "value2"
          Value "other"
    Value "source"
  If
    Op >
      Op >
        Value "200"
        Value "x"
      Value "60"
    Block
      Call
        Value "console"
          Access "log"
        Value "'in range'"
    Block
      Op ++!
        Value "obj"
          Access "count"
  Value "maybe"
    Access? "field"
    Index
      Value "0"
  In!
    Value "x"
    Arr
      Value "1"
      Bool yes
      Null
      Undefined"#;

#[test]
fn test_program_round_trips() {
    let tree = decode(PROGRAM).unwrap();
    assert_eq!(tree.render(), PROGRAM);
}

#[test]
fn test_render_is_a_fixed_point() {
    let tree = decode(PROGRAM).unwrap();
    let again = decode(&tree.render()).unwrap();
    assert_eq!(again, tree);
}

#[test]
fn test_program_structure() {
    let tree = decode(PROGRAM).unwrap();
    let NodeKind::Block { expressions } = &tree.kind else {
        panic!("expected a block, got {}", tree.name());
    };
    let kinds: Vec<&str> = expressions.iter().map(|n| n.name()).collect();
    assert_eq!(kinds, vec!["Comment", "Assign", "Assign", "If", "Value", "In"]);

    let NodeKind::In { negated, .. } = &expressions[5].kind else {
        panic!("expected a membership test");
    };
    assert!(*negated);
    assert_eq!(expressions[3].line, 19);
}

#[test]
fn test_multiline_string_argument() {
    let text = "Value \"\"first\\\nsecond\"\"";
    let tree = decode(text).unwrap();
    assert_eq!(tree.simple_name(), Some("\"first\nsecond\""));
    assert_eq!(tree.render(), text);
}

#[test]
fn test_decode_errors() {
    assert!(matches!(decode(""), Err(DecodeError::Malformed { .. })));
    assert!(matches!(
        decode("Block\n  Frobnicate"),
        Err(DecodeError::UnsupportedNodeKind { kind, line: 2 }) if kind == "Frobnicate"
    ));
    assert!(matches!(
        decode("Assign\n  Value \"x\""),
        Err(DecodeError::Malformed { .. })
    ));
}

#[test]
fn test_reader_speculation_rewinds() {
    let mut reader = DumpReader::new("Block\n  Value \"a\"");
    let marker = reader.mark();
    assert!(reader.read_if(|r| r.token() == "Assign").unwrap().is_none());
    assert_eq!(reader.line(), 1);

    let node = reader.read_if(|r| r.token() == "Block").unwrap().unwrap();
    assert_eq!(node.children().len(), 1);
    assert!(reader.rest().is_empty());

    reader.reset(marker);
    assert_eq!(reader.rest(), "Block\n  Value \"a\"");
}
