use thiserror::Error;

use crate::leb128::Leb128Error;

#[derive(Debug, Error)]
pub enum ParsingError {
    #[error("expected {expected} bytes, only {got} remained")]
    BytesLen { expected: usize, got: usize },

    #[error("the module does not start with the magic constant \\0asm")]
    NotAWasmModule,

    #[error("unsupported version {0:#x}, expected 1")]
    IllegalVersion(u32),

    #[error("unknown section id: {0:#04x}")]
    UnknownSection(u8),

    #[error("unknown value type: {0:#04x}")]
    UnknownValueType(u8),

    #[error("unknown export kind: {0:#04x}")]
    UnknownExportKind(u8),

    #[error("function {index} has type index {type_index}, but the type section only has {type_count} entries")]
    FunctionWithoutSignature {
        index: usize,
        type_index: usize,
        type_count: usize,
    },

    #[error("function {index} has no corresponding code body (code section has {code_count} entries)")]
    FunctionWithoutCode { index: usize, code_count: usize },

    #[error("export {name:?} references function index {index}, but the module only has {function_count} functions")]
    ExportFunctionOutOfBounds {
        name: String,
        index: usize,
        function_count: usize,
    },

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid UTF-8 export name: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Leb128(#[from] Leb128Error),
}
