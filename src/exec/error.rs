use thiserror::Error;

use crate::leb128::Leb128Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("pop was called on an empty operand stack")]
    EmptyStack,

    #[error("operand stack overflow: capacity is {capacity}")]
    StackOverflow { capacity: usize },

    #[error("local.get index {index} out of bounds for {param_count} parameter(s)")]
    ParamOutOfBounds { index: usize, param_count: usize },

    #[error("expected {expected} on the operand stack, got {got:?} instead")]
    WrongType { expected: &'static str, got: crate::exec::Value },

    #[error("call instruction has no function-index immediate")]
    EmptyFuncIndex,

    #[error("function expects {expected} argument(s), got {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("function index {index} out of bounds for {function_count} function(s)")]
    FunctionIndexOutOfBounds { index: usize, function_count: usize },

    #[error("unknown instruction: {0:#04x}")]
    UnknownInstruction(u8),

    #[error("failed to find if end")]
    IfEndNotFound,

    #[error("function ended with {got} value(s) on the stack, expected {expected}")]
    ResultArityMismatch { expected: usize, got: usize },

    #[error("in function {function_index}: {source}")]
    InFunction {
        function_index: usize,
        #[source]
        source: Box<ExecutionError>,
    },

    #[error(transparent)]
    Leb128(#[from] Leb128Error),
}
