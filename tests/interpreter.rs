//! Black-box end-to-end scenarios from `spec.md` §8. Each test builds a
//! minimal Wasm module byte-for-byte (there is no Wasm toolchain available
//! in this environment to produce `.wasm` fixture files) and drives it
//! through the full pipeline: `Parser::parse_module` → `Runtime::new` →
//! `Invocable::call`.
//!
//! Section/name length prefixes are computed with the crate's own
//! `leb128::encode_unsigned` rather than hand-counted, so a miscounted byte
//! literal can't silently desynchronize a section's declared length from
//! its actual payload.

use wasm_stack_runtime::exec::{Runtime, Value};
use wasm_stack_runtime::leb128::encode_unsigned;
use wasm_stack_runtime::parse::Parser;

const I32: u8 = 0x7F;

fn section(id: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut bytes = vec![id];
    bytes.extend(encode_unsigned(payload.len() as u64));
    bytes.extend(payload);
    bytes
}

fn functype(params: &[u8], results: &[u8]) -> Vec<u8> {
    let mut out = vec![0x60];
    out.extend(encode_unsigned(params.len() as u64));
    out.extend_from_slice(params);
    out.extend(encode_unsigned(results.len() as u64));
    out.extend_from_slice(results);
    out
}

fn type_section(functypes: Vec<Vec<u8>>) -> Vec<u8> {
    let mut payload = encode_unsigned(functypes.len() as u64);
    for ft in functypes {
        payload.extend(ft);
    }
    section(0x01, payload)
}

fn function_section(type_indices: &[u64]) -> Vec<u8> {
    let mut payload = encode_unsigned(type_indices.len() as u64);
    for ti in type_indices {
        payload.extend(encode_unsigned(*ti));
    }
    section(0x03, payload)
}

fn export_section(exports: &[(&str, u64)]) -> Vec<u8> {
    let mut payload = encode_unsigned(exports.len() as u64);
    for (name, index) in exports {
        payload.extend(encode_unsigned(name.len() as u64));
        payload.extend(name.as_bytes());
        payload.push(0x00); // export kind: function
        payload.extend(encode_unsigned(*index));
    }
    section(0x07, payload)
}

fn code_section(bodies: Vec<Vec<u8>>) -> Vec<u8> {
    let mut payload = encode_unsigned(bodies.len() as u64);
    for instructions in bodies {
        let mut body = encode_unsigned(0); // zero local-variable declarations
        body.extend(instructions);
        payload.extend(encode_unsigned(body.len() as u64));
        payload.extend(body);
    }
    section(0x0A, payload)
}

fn module_bytes(
    functypes: Vec<Vec<u8>>,
    type_indices: &[u64],
    exports: &[(&str, u64)],
    bodies: Vec<Vec<u8>>,
) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
    bytes.extend(type_section(functypes));
    bytes.extend(function_section(type_indices));
    bytes.extend(export_section(exports));
    bytes.extend(code_section(bodies));
    bytes
}

fn runtime_for(wasm: &[u8]) -> Runtime {
    let module = Parser::new(wasm).parse_module().expect("module should parse");
    Runtime::new(module)
}

#[test]
fn constant_return() {
    let wasm = module_bytes(
        vec![functype(&[], &[I32])],
        &[0],
        &[("helloWorld", 0)],
        vec![vec![0x41, 0x2A, 0x0B]], // i32.const 42; end
    );
    let runtime = runtime_for(&wasm);
    let result = runtime.get("helloWorld").unwrap().call(vec![]).unwrap();
    assert_eq!(result, vec![Value::I32(42)]);
}

#[test]
fn binary_arithmetic() {
    let wasm = module_bytes(
        vec![functype(&[I32, I32], &[I32])],
        &[0, 0, 0],
        &[("sum", 0), ("sub", 1), ("mul", 2)],
        vec![
            vec![0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B], // local.get 0; local.get 1; i32.add; end
            vec![0x20, 0x00, 0x20, 0x01, 0x6B, 0x0B], // i32.sub
            vec![0x20, 0x00, 0x20, 0x01, 0x6C, 0x0B], // i32.mul
        ],
    );
    let runtime = runtime_for(&wasm);

    let sum = runtime.get("sum").unwrap();
    assert_eq!(sum.call(vec![Value::I32(10), Value::I32(10)]).unwrap(), vec![Value::I32(20)]);

    let sub = runtime.get("sub").unwrap();
    assert_eq!(sub.call(vec![Value::I32(0), Value::I32(1)]).unwrap(), vec![Value::I32(-1)]);

    let mul = runtime.get("mul").unwrap();
    assert_eq!(mul.call(vec![Value::I32(9), Value::I32(8)]).unwrap(), vec![Value::I32(72)]);
}

#[test]
fn recursive_factorial() {
    // fac(n) = if n < 2 { 1 } else { n * fac(n - 1) }
    let instructions = vec![
        0x20, 0x00, // local.get 0 (n)
        0x41, 0x02, // i32.const 2
        0x48, // i32.lt_s -> n < 2
        0x04, I32, // if (result i32)
        0x41, 0x01, // i32.const 1
        0x05, // else
        0x20, 0x00, // local.get 0 (n)
        0x20, 0x00, // local.get 0 (n)
        0x41, 0x01, // i32.const 1
        0x6B, // i32.sub -> n - 1
        0x10, 0x00, // call 0 (fac)
        0x6C, // i32.mul -> n * fac(n - 1)
        0x0B, // end if
        0x0B, // end function
    ];
    let wasm = module_bytes(
        vec![functype(&[I32], &[I32])],
        &[0],
        &[("fac", 0)],
        vec![instructions],
    );
    let runtime = runtime_for(&wasm);
    let fac = runtime.get("fac").unwrap();

    for (n, expected) in [(3, 6), (5, 120), (10, 3_628_800), (12, 479_001_600)] {
        assert_eq!(fac.call(vec![Value::I32(n)]).unwrap(), vec![Value::I32(expected)]);
    }
}

#[test]
fn nested_if() {
    // nested_if(a, b) = if a < b { if a < b { a * 10 } else { 0 } } else { 3 }
    //
    // The inner `else` (instruction source for "unreachable") is never
    // exercised by either case below, since the outer and inner conditions
    // are identical; it holds a placeholder `i32.const 0` rather than a trap,
    // as trap semantics are out of scope (spec.md §1).
    let instructions = vec![
        0x20, 0x00, 0x20, 0x01, 0x48, // local.get 0; local.get 1; i32.lt_s
        0x04, I32, // outer if (result i32)
        0x20, 0x00, 0x20, 0x01, 0x48, // local.get 0; local.get 1; i32.lt_s
        0x04, I32, // inner if (result i32)
        0x20, 0x00, 0x41, 0x0A, 0x6C, // local.get 0; i32.const 10; i32.mul
        0x05, // inner else
        0x41, 0x00, // i32.const 0
        0x0B, // inner end
        0x05, // outer else
        0x41, 0x03, // i32.const 3
        0x0B, // outer end
        0x0B, // function end
    ];
    let wasm = module_bytes(
        vec![functype(&[I32, I32], &[I32])],
        &[0],
        &[("nested_if", 0)],
        vec![instructions],
    );
    let runtime = runtime_for(&wasm);
    let nested_if = runtime.get("nested_if").unwrap();

    assert_eq!(nested_if.call(vec![Value::I32(9), Value::I32(0)]).unwrap(), vec![Value::I32(3)]);
    assert_eq!(nested_if.call(vec![Value::I32(4), Value::I32(8)]).unwrap(), vec![Value::I32(40)]);
}

#[test]
fn if_without_else() {
    let wasm = module_bytes(
        vec![functype(&[], &[I32])],
        &[0],
        &[("f", 0)],
        vec![vec![0x41, 0x01, 0x41, 0x02, 0x48, 0x04, I32, 0x41, 0x01, 0x0B, 0x0B]],
    );
    let runtime = runtime_for(&wasm);
    assert_eq!(runtime.get("f").unwrap().call(vec![]).unwrap(), vec![Value::I32(1)]);
}

#[test]
fn missing_if_end_fails_at_call_time() {
    let wasm = module_bytes(
        vec![functype(&[], &[])],
        &[0],
        &[("f", 0)],
        vec![vec![0x04, I32, 0x41, 0x01]],
    );
    // The code section does not itself validate instruction well-formedness
    // (spec.md §4.3) — the module still parses successfully; the dangling
    // `if` only surfaces once the function is actually invoked.
    let runtime = runtime_for(&wasm);
    let err = runtime.get("f").unwrap().call(vec![]).unwrap_err();
    assert!(err.to_string().contains("failed to find if end"));
}

#[test]
fn unknown_export_is_absent() {
    let wasm = module_bytes(vec![functype(&[], &[I32])], &[0], &[("f", 0)], vec![vec![0x41, 0x01, 0x0B]]);
    let runtime = runtime_for(&wasm);
    assert!(runtime.get("does_not_exist").is_none());
}

#[test]
fn bad_header_fails_to_load() {
    let wasm = [0x00, 0x61, 0x73, 0x00, 0x01, 0x00, 0x00, 0x00];
    assert!(Parser::new(&wasm).parse_module().is_err());
}
