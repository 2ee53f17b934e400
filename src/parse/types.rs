use std::fmt;
use std::sync::Arc;

use num_enum::TryFromPrimitive;

/// <https://webassembly.github.io/spec/core/binary/modules.html#sections>
///
/// Only the section IDs this core recognizes are listed; any other byte
/// fails `TryFrom` and is surfaced by the parser as `ParsingError::UnknownSection`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub enum SectionId {
    Type = 0x01,
    Import = 0x02,
    Function = 0x03,
    Export = 0x07,
    Start = 0x08,
    Code = 0x0A,
}

/// <https://webassembly.github.io/spec/core/binary/types.html#value-types>
#[derive(Eq, PartialEq, Debug, Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueType {
    I32 = 0x7F,
    I64 = 0x7E,
    F32 = 0x7D,
    F64 = 0x7C,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

/// Tag byte introducing a function type in the type section.
pub const FUNCTION_TYPE_TAG: u8 = 0x60;

/// <https://webassembly.github.io/spec/core/binary/modules.html#export-section>
#[derive(Eq, PartialEq, Debug, Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub enum ExportKind {
    Function = 0x00,
    Table = 0x01,
    Memory = 0x02,
    Global = 0x03,
}

/// An ordered sequence of parameter value-types and an ordered sequence of
/// result value-types, identified by its index in the module's type table.
#[derive(Eq, PartialEq, Debug, Default, Clone)]
pub struct FunctionSignature {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")?;
        if !self.results.is_empty() {
            write!(f, " -> (")?;
            for (i, result) in self.results.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{result}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A name, an exported-kind tag, and an index into the relevant index space.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub index: usize,
}

/// A list of local-variable declarations followed by the raw instruction byte
/// stream, including its trailing `end` opcode.
#[derive(Eq, PartialEq, Debug, Default, Clone)]
pub struct CodeBody {
    pub locals: Vec<ValueType>,
    pub instructions: Vec<u8>,
}

/// A function fully cross-linked with its signature and code body. A
/// `Module` only ever exposes `Function`s in this linked state — the linker
/// pass in `Parser::parse_module` is the only place the pre-link
/// `(type_index, code_index)` pair is handled, so `FunctionWithoutSignature`
/// / `FunctionWithoutCode` can never leak into a returned `Module`.
#[derive(Debug, Clone)]
pub struct Function {
    pub type_index: usize,
    pub signature: Arc<FunctionSignature>,
    pub code: Arc<CodeBody>,
}

/// A parsed, linked WebAssembly module.
#[derive(Debug)]
pub struct Module {
    pub magic: u32,
    pub version: u32,
    pub types: Vec<Arc<FunctionSignature>>,
    pub functions: Vec<Function>,
    pub exports: Vec<Export>,
}
