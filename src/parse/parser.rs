use std::sync::Arc;

use tracing::trace;

use crate::leb128;
use crate::parse::error::ParsingError;
use crate::parse::types::*;

const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// Walks a byte slice with an explicit cursor. Used both for the whole module
/// (to find section boundaries) and, recursively, for each section's own
/// payload (to decode that section's records).
pub struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn read_byte(&mut self) -> Result<u8, ParsingError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ParsingError::UnexpectedEof { context: "byte" })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], ParsingError> {
        let end = self.pos + n;
        let slice = self.bytes.get(self.pos..end).ok_or(ParsingError::BytesLen {
            expected: n,
            got: self.bytes.len().saturating_sub(self.pos),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn read_uleb(&mut self) -> Result<u64, ParsingError> {
        let (consumed, value) = leb128::decode_unsigned(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_value_type(&mut self) -> Result<ValueType, ParsingError> {
        let byte = self.read_byte()?;
        ValueType::try_from(byte).map_err(|_| ParsingError::UnknownValueType(byte))
    }

    fn read_value_types(&mut self) -> Result<Vec<ValueType>, ParsingError> {
        let count = self.read_uleb()? as usize;
        let mut types = Vec::with_capacity(count);
        for _ in 0..count {
            types.push(self.read_value_type()?);
        }
        Ok(types)
    }

    fn read_string(&mut self) -> Result<String, ParsingError> {
        let len = self.read_uleb()? as usize;
        let bytes = self.read_exact(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn parse_type_section(&mut self) -> Result<Vec<Arc<FunctionSignature>>, ParsingError> {
        let count = self.read_uleb()? as usize;
        trace!(count, "parsing type section");
        let mut types = Vec::with_capacity(count);
        for i in 0..count {
            let tag = self.read_byte()?;
            if tag != FUNCTION_TYPE_TAG {
                // This core assumes function types only; a non-function tag
                // here means the type table layout diverges from what we can
                // decode, so there is nothing sound left to skip past.
                return Err(ParsingError::UnknownValueType(tag));
            }
            let params = self.read_value_types()?;
            let results = self.read_value_types()?;
            let signature = FunctionSignature { params, results };
            trace!(index = i, %signature, "parsed function signature");
            types.push(Arc::new(signature));
        }
        Ok(types)
    }

    /// Returns the type index of each declared function, in order. The
    /// signature/code cross-link happens after every section has been read.
    fn parse_function_section(&mut self) -> Result<Vec<usize>, ParsingError> {
        let count = self.read_uleb()? as usize;
        trace!(count, "parsing function section");
        let mut type_indices = Vec::with_capacity(count);
        for _ in 0..count {
            type_indices.push(self.read_uleb()? as usize);
        }
        Ok(type_indices)
    }

    fn parse_export_section(&mut self) -> Result<Vec<Export>, ParsingError> {
        let count = self.read_uleb()? as usize;
        trace!(count, "parsing export section");
        let mut exports = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.read_string()?;
            let kind_byte = self.read_byte()?;
            let kind = ExportKind::try_from(kind_byte).map_err(|_| ParsingError::UnknownExportKind(kind_byte))?;
            let index = self.read_uleb()? as usize;
            trace!(name, index, "parsed export");
            exports.push(Export { name, kind, index });
        }
        Ok(exports)
    }

    fn parse_code_section(&mut self) -> Result<Vec<Arc<CodeBody>>, ParsingError> {
        let count = self.read_uleb()? as usize;
        trace!(count, "parsing code section");
        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            let body_len = self.read_uleb()? as usize;
            let body_bytes = self.read_exact(body_len)?;
            let mut body = Parser::new(body_bytes);

            let local_decl_count = body.read_uleb()? as usize;
            let mut locals = Vec::new();
            for _ in 0..local_decl_count {
                let repeat = body.read_uleb()? as usize;
                let value_type = body.read_value_type()?;
                locals.extend(std::iter::repeat(value_type).take(repeat));
            }

            let instructions = body.bytes[body.pos..].to_vec();
            codes.push(Arc::new(CodeBody { locals, instructions }));
        }
        Ok(codes)
    }

    /// Parses the whole module: header, sections, and the linker pass that
    /// cross-links each function's signature and code body.
    pub fn parse_module(mut self) -> Result<Module, ParsingError> {
        let magic_bytes = self.read_exact(4)?;
        if magic_bytes != MAGIC {
            return Err(ParsingError::NotAWasmModule);
        }
        let magic = u32::from_le_bytes(magic_bytes.try_into().unwrap());

        let version_bytes = self.read_exact(4)?;
        let version = u32::from_le_bytes(version_bytes.try_into().unwrap());
        if version != 1 {
            return Err(ParsingError::IllegalVersion(version));
        }

        let mut types: Vec<Arc<FunctionSignature>> = Vec::new();
        let mut function_type_indices: Vec<usize> = Vec::new();
        let mut exports: Vec<Export> = Vec::new();
        let mut codes: Vec<Arc<CodeBody>> = Vec::new();

        while !self.at_end() {
            let section_id_byte = self.read_byte()?;
            let section_id =
                SectionId::try_from(section_id_byte).map_err(|_| ParsingError::UnknownSection(section_id_byte))?;
            let section_len = self.read_uleb()? as usize;
            let payload = self.read_exact(section_len)?;
            trace!(?section_id, section_len, "parsing section");
            let mut section_parser = Parser::new(payload);
            match section_id {
                SectionId::Type => types = section_parser.parse_type_section()?,
                SectionId::Function => function_type_indices = section_parser.parse_function_section()?,
                SectionId::Export => exports = section_parser.parse_export_section()?,
                SectionId::Code => codes = section_parser.parse_code_section()?,
                // Imports and start functions are acknowledged but not
                // materialized: spec.md scopes memory/table/global/import
                // handling out of this core.
                SectionId::Import | SectionId::Start => {}
            }
        }

        let functions = Self::link_functions(&types, function_type_indices, &codes)?;

        for export in &exports {
            if export.kind == ExportKind::Function && export.index >= functions.len() {
                return Err(ParsingError::ExportFunctionOutOfBounds {
                    name: export.name.clone(),
                    index: export.index,
                    function_count: functions.len(),
                });
            }
        }

        Ok(Module {
            magic,
            version,
            types,
            functions,
            exports,
        })
    }

    fn link_functions(
        types: &[Arc<FunctionSignature>],
        function_type_indices: Vec<usize>,
        codes: &[Arc<CodeBody>],
    ) -> Result<Vec<Function>, ParsingError> {
        let mut functions = Vec::with_capacity(function_type_indices.len());
        for (index, type_index) in function_type_indices.into_iter().enumerate() {
            let signature = types
                .get(type_index)
                .cloned()
                .ok_or(ParsingError::FunctionWithoutSignature {
                    index,
                    type_index,
                    type_count: types.len(),
                })?;
            let code = codes
                .get(index)
                .cloned()
                .ok_or(ParsingError::FunctionWithoutCode { index, code_count: codes.len() })?;
            functions.push(Function { type_index, signature, code });
        }
        Ok(functions)
    }
}
