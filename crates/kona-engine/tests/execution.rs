//! End-to-end execution of decoded programs

use kona_engine::compiler::CompileError;
use kona_engine::{BinaryOp, DynamicObject, MemorySource, RuntimeContext, Value, VmError};

fn context() -> RuntimeContext {
    RuntimeContext::new(MemorySource::new())
}

fn run(dump: &str) -> Value {
    context().execute(dump).expect("program runs")
}

fn items(value: Value) -> Vec<Value> {
    value.as_array().expect("an array").to_vec()
}

#[test]
fn test_hoisted_local_seen_by_earlier_closure() {
    let dump = r#"Block
  Assign
    Value "getLater"
    Code
      Block
        Value "later"
  Assign
    Value "later"
    Value "7"
  Call
    Value "getLater""#;
    assert_eq!(run(dump), Value::Int(7));
}

#[test]
fn test_chained_comparison_evaluates_middle_once() {
    let dump = r#"Block
  Assign
    Value "count"
    Value "0"
  Assign
    Value "x"
    Code
      Block
        Op "++"
          Value "count"
        Value "100"
  Assign
    Value "inRange"
    Op ">"
      Op ">"
        Value "200"
        Call
          Value "x"
      Value "60"
  Arr
    Value "inRange"
    Value "count""#;
    assert_eq!(items(run(dump)), vec![Value::Bool(true), Value::Int(1)]);
}

#[test]
fn test_chained_comparison_false_on_either_side() {
    let dump = r#"Op "<"
  Op "<"
    Value "1"
    Value "5"
  Value "3""#;
    assert_eq!(run(dump), Value::Bool(false));
}

#[test]
fn test_strict_equality_chains() {
    let dump = r#"Op "==="
  Op "==="
    Value "1"
    Value "1"
  Value "1""#;
    assert_eq!(run(dump), Value::Bool(true));

    let middle_once = r#"Block
  Assign
    Value "count"
    Value "0"
  Assign
    Value "x"
    Code
      Block
        Op "++"
          Value "count"
        Value "5"
  Arr
    Op "!=="
      Op "==="
        Value "5"
        Call
          Value "x"
      Value "6"
    Value "count""#;
    assert_eq!(items(run(middle_once)), vec![Value::Bool(true), Value::Int(1)]);
}

#[test]
fn test_destructuring_binds_only_named_members() {
    let dump = r#"Block
  Assign
    Value "source"
    Obj
      Assign
        Value "value1"
        Value "1"
      Assign
        Value "value2"
        Value "2"
      Assign
        Value "value3"
        Value "3"
  Assign
    Value
      Obj
        Value "value1"
        Assign
          Value "value2"
          Value "renamed"
    Value "source"
  Arr
    Value "value1"
    Value "renamed"
    Existence
      Value "value2"
    Existence
      Value "value3""#;
    assert_eq!(
        items(run(dump)),
        vec![Value::Int(1), Value::Int(2), Value::Bool(false), Value::Bool(false)]
    );
}

#[test]
fn test_repeated_calls_hit_the_site_cache() {
    let dump = r#"Block
  Assign
    Value "square"
    Code
      Param "x"
      Block
        Op "*"
          Value "x"
          Value "x"
  Call
    Value "square"
    Value "3"
  Call
    Value "square"
    Value "4""#;
    let ctx = context();
    assert_eq!(ctx.execute(dump).unwrap(), Value::Int(16));

    let invoke = ctx.sites().invoke(1).stats();
    assert_eq!(invoke.resolutions, 1);
    assert_eq!(invoke.hits, 1);

    let multiply = ctx.sites().binary(BinaryOp::Mul).stats();
    assert_eq!(multiply.resolutions, 1);
    assert_eq!(multiply.hits, 1);
    assert_eq!(multiply.entries, 1);
}

#[test]
fn test_site_cache_is_polymorphic() {
    let dump = r#"Block
  Assign
    Value "add"
    Code
      Param "a"
      Param "b"
      Block
        Op "+"
          Value "a"
          Value "b"
  Arr
    Call
      Value "add"
      Value "1"
      Value "2"
    Call
      Value "add"
      Value '"a"'
      Value '"b"'
    Call
      Value "add"
      Value "1.5"
      Value "1"
    Call
      Value "add"
      Value "3"
      Value "4""#;
    let ctx = context();
    let result = items(ctx.execute(dump).unwrap());
    assert_eq!(
        result,
        vec![Value::Int(3), Value::string("ab"), Value::Double(2.5), Value::Int(7)]
    );

    let add = ctx.sites().binary(BinaryOp::Add).stats();
    assert_eq!(add.entries, 3);
    assert_eq!(add.resolutions, 3);
    assert_eq!(add.hits, 1);
}

const PREFIX_INCREMENT: &str = r#"Block
  Assign
    Value "obj"
    Obj
      Assign
        Value "count"
        Value "1"
  Assign
    Value "first"
    Op "++"
      Value "obj"
        Access "count"
  Assign
    Value "second"
    Op "++"
      Value "obj"
        Access "count"
  Arr
    Value "first"
    Value "second"
    Value "obj"
      Access "count""#;

#[test]
fn test_prefix_increment_on_member() {
    assert_eq!(
        items(run(PREFIX_INCREMENT)),
        vec![Value::Int(2), Value::Int(3), Value::Int(3)]
    );
}

#[test]
fn test_postfix_increment_on_member() {
    let dump = PREFIX_INCREMENT.replace("Op \"++\"", "Op \"++!\"");
    assert_eq!(
        items(run(&dump)),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn test_decrement_on_local_and_index() {
    let dump = r#"Block
  Assign
    Value "n"
    Value "5"
  Assign
    Value "list"
    Arr
      Value "10"
  Assign
    Value "old"
    Op "--!"
      Value "n"
  Op "--"
    Value "list"
      Index
        Value "0"
  Arr
    Value "old"
    Value "n"
    Value "list"
      Index
        Value "0""#;
    assert_eq!(
        items(run(dump)),
        vec![Value::Int(5), Value::Int(4), Value::Int(9)]
    );
}

#[test]
fn test_increment_exported_value_from_function() {
    let counter = r#"Block
  Assign
    Value "exports"
      Access "value"
    Value "1"
  Assign
    Value "exports"
      Access "increment"
    Code
      Block
        Op "++"
          Value "exports"
            Access "value"
  Assign
    Value "exports"
      Access "postIncrement"
    Code
      Block
        Op "++!"
          Value "exports"
            Access "value""#;
    let ctx = RuntimeContext::new(MemorySource::new().with_module("counter", counter));
    let exports = ctx.require("counter").unwrap();
    let module = Value::Object(exports.clone());

    assert_eq!(ctx.call_member(&module, "increment", &[]).unwrap(), Value::Int(2));
    assert_eq!(ctx.call_member(&module, "increment", &[]).unwrap(), Value::Int(3));
    assert_eq!(exports.get("value"), Some(Value::Int(3)));

    exports.set("value", Value::Int(1));
    assert_eq!(ctx.call_member(&module, "postIncrement", &[]).unwrap(), Value::Int(1));
    assert_eq!(ctx.call_member(&module, "postIncrement", &[]).unwrap(), Value::Int(2));
    assert_eq!(exports.get("value"), Some(Value::Int(3)));
}

#[test]
fn test_index_write_far_past_the_end_fails() {
    let dump = r#"Block
  Assign
    Value "list"
    Arr
  Assign
    Value "list"
      Index
        Value "2000000000"
    Value "1""#;
    assert!(matches!(context().execute(dump), Err(VmError::TypeError(_))));
}

#[test]
fn test_module_level_this_is_the_global_object() {
    let dump = r#"Block
  Assign
    Value "this"
      Access "value"
    Value "5"
  Call
    Code
      Block
        Value "value""#;
    let ctx = context();
    assert_eq!(ctx.execute(dump).unwrap(), Value::Int(5));
    assert_eq!(ctx.globals().get("value"), Some(Value::Int(5)));
}

#[test]
fn test_undefined_reference_is_raised_at_evaluation() {
    let ctx = context();
    let dump = r#"Block
  Assign
    Value "later"
    Code
      Block
        Value "missing"
  Value "1""#;
    assert_eq!(ctx.execute(dump).unwrap(), Value::Int(1));

    match ctx.execute("Value \"missing\"") {
        Err(VmError::UndefinedReference { name }) => assert_eq!(name, "missing"),
        other => panic!("expected an undefined reference, got {:?}", other),
    }
}

#[test]
fn test_unsupported_construct_is_a_compile_error() {
    let result = context().execute("While\n  Value \"x\"\n  Block");
    match result {
        Err(VmError::Compile(CompileError::UnsupportedConstruct { kind, .. })) => assert_eq!(kind, "While"),
        other => panic!("expected an unsupported construct, got {:?}", other),
    }
}

#[test]
fn test_default_operator() {
    let dump = r#"Block
  Assign
    Value "present"
    Value "0"
  Arr
    Op "?"
      Value "absent"
      Value '"fallback"'
    Op "?"
      Value "present"
      Value '"fallback"'
    Op "?"
      Value "null"
      Value '"fallback"'"#;
    assert_eq!(
        items(run(dump)),
        vec![Value::string("fallback"), Value::Int(0), Value::string("fallback")]
    );
}

#[test]
fn test_soaked_access_short_circuits() {
    let dump = r#"Block
  Assign
    Value "nothing"
    Value "null"
  Value "nothing"
    Access? "length"
    Access "more""#;
    assert_eq!(run(dump), Value::Undefined);
}

#[test]
fn test_soaks_on_undeclared_names() {
    let dump = r#"Arr
  Value "missing"
    Access? "x"
  Call?
    Value "missingFn"
  Call
    Value "missingObj"
      Access? "run""#;
    let ctx = context();
    assert_eq!(
        items(ctx.execute(dump).unwrap()),
        vec![Value::Undefined, Value::Undefined, Value::Undefined]
    );

    let found = DynamicObject::new();
    found.set("x", Value::Int(5));
    ctx.globals().set("missing", Value::Object(found));
    assert_eq!(ctx.execute("Value \"missing\"\n  Access? \"x\"").unwrap(), Value::Int(5));
}

#[test]
fn test_string_and_array_intrinsics() {
    let dump = r#"Block
  Assign
    Value "list"
    Arr
      Value "1"
  Call
    Value "list"
      Access "Push"
    Value "2"
  Arr
    Value '"hello"'
      Access "Length"
    Call
      Value '"hello"'
        Access "ToUpper"
    Value "list"
      Access "Length"
    Call
      Value '"hello"'
        Access "Contains"
      Value '"ell"'"#;
    assert_eq!(
        items(run(dump)),
        vec![Value::Int(5), Value::string("HELLO"), Value::Int(2), Value::Bool(true)]
    );
}

#[test]
fn test_conditionals_and_early_return() {
    let dump = r#"Block
  Assign
    Value "pick"
    Code
      Param "flag"
      Block
        If
          Value "flag"
          Block
            Return
              Value '"early"'
        Value '"late"'
  Arr
    Call
      Value "pick"
      Bool "true"
    Call
      Value "pick"
      Bool "false""#;
    assert_eq!(
        items(run(dump)),
        vec![Value::string("early"), Value::string("late")]
    );
}

#[test]
fn test_membership() {
    let dump = r#"Arr
  In
    Value "2"
    Arr
      Value "1"
      Value "2"
  In!
    Value "2"
    Arr
      Value "1"
      Value "2""#;
    assert_eq!(items(run(dump)), vec![Value::Bool(true), Value::Bool(false)]);
}

#[test]
fn test_runtime_errors() {
    let ctx = context();
    assert!(matches!(
        ctx.execute("Op \"/\"\n  Value \"1\"\n  Value \"0\""),
        Err(VmError::DivideByZero)
    ));

    match ctx.execute("Op \"-\"\n  Value '\"a\"'\n  Value \"1\"") {
        Err(VmError::NoMatchingOverload { member, arg_count, .. }) => {
            assert_eq!(member, "-");
            assert_eq!(arg_count, 2);
        }
        other => panic!("expected no matching overload, got {:?}", other),
    }

    match ctx.execute("Throw\n  Value '\"boom\"'") {
        Err(VmError::Thrown { message }) => assert_eq!(message, "boom"),
        other => panic!("expected a thrown value, got {:?}", other),
    }

    assert!(matches!(
        ctx.execute("Call\n  Value \"1\""),
        Err(VmError::NotCallable { .. })
    ));
}

#[test]
fn test_script_function_arity_is_fixed() {
    let dump = r#"Block
  Assign
    Value "square"
    Code
      Param "x"
      Block
        Op "*"
          Value "x"
          Value "x"
  Call
    Value "square"
    Value "1"
    Value "2""#;
    match context().execute(dump) {
        Err(VmError::NoMatchingOverload { member, arg_count, .. }) => {
            assert_eq!(member, "square");
            assert_eq!(arg_count, 2);
        }
        other => panic!("expected an arity error, got {:?}", other),
    }
}

#[test]
fn test_methods_receive_their_object() {
    let dump = r#"Block
  Assign
    Value "counter"
    Obj
      Assign
        Value "count"
        Value "10"
      Assign
        Value "bump"
        Code
          Block
            Op "++"
              Value "this"
                Access "count"
  Call
    Value "counter"
      Access "bump"
  Call
    Value "counter"
      Access "bump""#;
    assert_eq!(run(dump), Value::Int(12));
}

#[test]
fn test_host_calls_through_context() {
    let ctx = context();
    let dump = r#"Obj
  Assign
    Value "twice"
    Code
      Param "n"
      Block
        Op "*"
          Value "n"
          Value "2""#;
    let object = ctx.execute(dump).unwrap();
    assert_eq!(
        ctx.call_member(&object, "twice", &[Value::Int(21)]).unwrap(),
        Value::Int(42)
    );

    let twice = ctx.get_member(&object, "twice").unwrap();
    assert_eq!(ctx.call(&twice, &[Value::Int(4)]).unwrap(), Value::Int(8));

    ctx.set_member(&object, "label", Value::string("x")).unwrap();
    assert_eq!(ctx.get_member(&object, "label").unwrap(), Value::string("x"));
    assert_eq!(ctx.get_member(&object, "nothing").unwrap(), Value::Undefined);
}
