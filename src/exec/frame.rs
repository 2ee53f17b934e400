use tracing::{debug_span, trace};

use crate::exec::error::ExecutionError;
use crate::exec::opcode::{Opcode, EMPTY_BLOCKTYPE};
use crate::exec::operand_stack::{OperandStack, DEFAULT_CAPACITY};
use crate::exec::value::Value;
use crate::leb128;
use crate::parse::types::{Module, ValueType};

/// The interpreter's per-invocation state: a program counter into an
/// instruction byte slice, an operand stack, the declared parameter values,
/// and the declared result types. Structured blocks (`if`/`else`) spawn a
/// child `CallFrame` over a sub-slice of the same instruction stream; the
/// child inherits the parent's parameters but owns an independent operand
/// stack, so a block's partial results never leak into the enclosing scope.
pub struct CallFrame<'code> {
    instructions: &'code [u8],
    params: Vec<Value>,
    results: Vec<ValueType>,
    stack: OperandStack,
}

impl<'code> CallFrame<'code> {
    pub fn new(instructions: &'code [u8], params: Vec<Value>, results: Vec<ValueType>) -> Self {
        Self {
            instructions,
            params,
            results,
            stack: OperandStack::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Executes the instruction stream to completion, returning the declared
    /// result values. Reaching `end`/`return` or falling off the end of the
    /// slice both go through [`Self::finish`]; the only difference between a
    /// function body and a structured block's body is that the former always
    /// carries a trailing `end` byte and the latter never does.
    pub fn run(&mut self, module: &Module) -> Result<Vec<Value>, ExecutionError> {
        let mut pc = 0usize;
        while pc < self.instructions.len() {
            let opcode_byte = self.instructions[pc];
            let opcode =
                Opcode::try_from(opcode_byte).map_err(|_| ExecutionError::UnknownInstruction(opcode_byte))?;
            trace!(pc, %opcode, "executing instruction");

            match opcode {
                Opcode::LocalGet => {
                    let (consumed, index) = leb128::decode_unsigned(&self.instructions[pc + 1..])?;
                    let index = index as usize;
                    let value = *self
                        .params
                        .get(index)
                        .ok_or(ExecutionError::ParamOutOfBounds { index, param_count: self.params.len() })?;
                    self.stack.push(value)?;
                    pc += 1 + consumed;
                }
                Opcode::I32Const => {
                    let (consumed, value) = leb128::decode_signed_32(&self.instructions[pc + 1..])?;
                    self.stack.push(Value::I32(value))?;
                    pc += 1 + consumed;
                }
                Opcode::I32Add => {
                    let rhs = self.stack.pop_i32()?;
                    let lhs = self.stack.pop_i32()?;
                    self.stack.push(Value::I32(lhs.wrapping_add(rhs)))?;
                    pc += 1;
                }
                Opcode::I32Sub => {
                    let rhs = self.stack.pop_i32()?;
                    let lhs = self.stack.pop_i32()?;
                    self.stack.push(Value::I32(lhs.wrapping_sub(rhs)))?;
                    pc += 1;
                }
                Opcode::I32Mul => {
                    let rhs = self.stack.pop_i32()?;
                    let lhs = self.stack.pop_i32()?;
                    self.stack.push(Value::I32(lhs.wrapping_mul(rhs)))?;
                    pc += 1;
                }
                Opcode::I32LtS => {
                    let rhs = self.stack.pop_i32()?;
                    let lhs = self.stack.pop_i32()?;
                    self.stack.push(Value::I32(i32::from(lhs < rhs)))?;
                    pc += 1;
                }
                Opcode::If => {
                    pc = self.exec_if(pc, module)?;
                }
                Opcode::Call => {
                    if pc + 1 >= self.instructions.len() {
                        return Err(ExecutionError::EmptyFuncIndex);
                    }
                    let (consumed, func_index) = leb128::decode_unsigned(&self.instructions[pc + 1..])?;
                    let func_index = func_index as usize;
                    let arity = module
                        .functions
                        .get(func_index)
                        .ok_or(ExecutionError::FunctionIndexOutOfBounds {
                            index: func_index,
                            function_count: module.functions.len(),
                        })?
                        .signature
                        .params
                        .len();
                    let args = self.stack.pop_n(arity)?;
                    let results = invoke(module, func_index, args)?;
                    for value in results {
                        self.stack.push(value)?;
                    }
                    pc += 1 + consumed;
                }
                Opcode::Return | Opcode::End => return self.finish(),
                Opcode::Else => {
                    // Only reachable here if an `else` appears outside any `if`
                    // this frame is executing; exec_if always slices the
                    // branch bodies so that a legitimate `else` never reaches
                    // the dispatch loop.
                    return Err(ExecutionError::UnknownInstruction(opcode_byte));
                }
            }
        }
        self.finish()
    }

    /// Handles `if` at `if_pc`: decodes the blocktype, forward-scans for the
    /// matching `else`/`end`, executes the taken branch in a child frame, and
    /// returns the instruction position the parent should resume at
    /// (`matching_end + 1`).
    fn exec_if(&mut self, if_pc: usize, module: &Module) -> Result<usize, ExecutionError> {
        let blocktype_pos = if_pc + 1;
        let blocktype_byte = *self.instructions.get(blocktype_pos).ok_or(ExecutionError::IfEndNotFound)?;
        let block_result = if blocktype_byte == EMPTY_BLOCKTYPE {
            None
        } else {
            Some(ValueType::try_from(blocktype_byte).map_err(|_| ExecutionError::IfEndNotFound)?)
        };

        let body_start = blocktype_pos + 1;
        let (else_pos, end_pos) = find_matching_else_end(self.instructions, body_start)?;

        let condition = self.stack.pop_i32()?;
        let (branch_start, branch_end) = if condition != 0 {
            (body_start, else_pos.unwrap_or(end_pos))
        } else if let Some(else_pos) = else_pos {
            (else_pos + 1, end_pos)
        } else {
            (end_pos, end_pos)
        };

        let results = block_result.into_iter().collect::<Vec<_>>();
        let branch_instructions = &self.instructions[branch_start..branch_end];
        let mut child = CallFrame::new(branch_instructions, self.params.clone(), results);
        let values = child.run(module)?;
        for value in values {
            self.stack.push(value)?;
        }
        Ok(end_pos + 1)
    }

    /// Validates the operand stack against the declared result arity and
    /// types, then pops exactly that many values in LIFO order.
    fn finish(&mut self) -> Result<Vec<Value>, ExecutionError> {
        let expected = self.results.len();
        if self.stack.len() < expected {
            return Err(ExecutionError::ResultArityMismatch { expected, got: self.stack.len() });
        }
        let values = self.stack.pop_n(expected)?;
        for (value, declared) in values.iter().zip(self.results.iter()) {
            if value.value_type() != *declared {
                return Err(ExecutionError::WrongType {
                    expected: "declared result type",
                    got: *value,
                });
            }
        }
        Ok(values)
    }
}

/// Forward-scans `instructions` from `start` — the first byte of an `if`'s
/// body — for the `else`/`end` that match that `if`, respecting nesting.
/// Opcodes with LEB128 immediates (`local.get`, `i32.const`, `call`) have
/// their immediate bytes skipped so an immediate byte can never be
/// misinterpreted as a control-flow delimiter.
fn find_matching_else_end(
    instructions: &[u8],
    start: usize,
) -> Result<(Option<usize>, usize), ExecutionError> {
    let mut pos = start;
    let mut depth = 0u32;
    let mut else_position = None;

    while pos < instructions.len() {
        let byte = instructions[pos];
        let opcode = Opcode::try_from(byte).map_err(|_| ExecutionError::UnknownInstruction(byte))?;
        match opcode {
            Opcode::If => {
                depth += 1;
                pos += 2; // opcode byte + blocktype byte
            }
            Opcode::Else if depth == 0 => {
                else_position = Some(pos);
                pos += 1;
            }
            Opcode::End if depth == 0 => {
                return Ok((else_position, pos));
            }
            Opcode::End => {
                depth -= 1;
                pos += 1;
            }
            other => {
                pos += 1 + immediate_len(other, &instructions[pos + 1..])?;
            }
        }
    }
    Err(ExecutionError::IfEndNotFound)
}

/// Number of bytes an opcode's immediate operand occupies, given the bytes
/// following the opcode byte. LEB128-encoded immediates are only counted,
/// never interpreted — signed and unsigned LEB128 share the same
/// continuation-bit terminator, so `decode_unsigned` reports the correct
/// byte count regardless of the immediate's actual signedness.
fn immediate_len(opcode: Opcode, rest: &[u8]) -> Result<usize, ExecutionError> {
    match opcode {
        Opcode::LocalGet | Opcode::I32Const | Opcode::Call => {
            let (consumed, _) = leb128::decode_unsigned(rest)?;
            Ok(consumed)
        }
        _ => Ok(0),
    }
}

/// Invokes function `function_index` in `module` with `args`, wrapping any
/// failure with the function index per `spec.md` §7's propagation rule.
/// This is the single entry point both `Runtime`/`Invocable` (top-level
/// calls) and the `call` opcode (nested calls) go through.
pub fn invoke(module: &Module, function_index: usize, args: Vec<Value>) -> Result<Vec<Value>, ExecutionError> {
    (|| {
        let function = module
            .functions
            .get(function_index)
            .ok_or(ExecutionError::FunctionIndexOutOfBounds {
                index: function_index,
                function_count: module.functions.len(),
            })?;
        let _span = debug_span!("call", function_index, signature = %function.signature).entered();

        if args.len() != function.signature.params.len() {
            return Err(ExecutionError::ArgumentCountMismatch {
                expected: function.signature.params.len(),
                got: args.len(),
            });
        }

        let mut params = Vec::with_capacity(function.signature.params.len());
        for (declared_type, arg) in function.signature.params.iter().zip(args) {
            params.push(if arg.value_type() == *declared_type {
                arg
            } else {
                return Err(ExecutionError::WrongType { expected: "declared parameter type", got: arg });
            });
        }

        let results = function.signature.results.clone();
        let mut frame = CallFrame::new(&function.code.instructions, params, results);
        frame.run(module)
    })()
    .map_err(|source| ExecutionError::InFunction { function_index, source: Box::new(source) })
}
