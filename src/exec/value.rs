use crate::exec::error::ExecutionError;
use crate::parse::types::ValueType;

/// A tagged numeric value. Only `I32` is exercised by the interpreter's
/// arithmetic and comparison opcodes; the other three variants exist so the
/// tag set can distinguish all four Wasm numeric kinds for signature
/// checking (parameter zero-initialization, result-arity validation).
///
/// Comparison results (`i32.lt_s`) are plain `I32(0)`/`I32(1)` — the wire
/// format has no separate boolean type, so there is no `Bool` variant here
/// either.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The value's tag, used for signature and type-mismatch checking.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The zero value for a declared value type, used to pre-initialize a
    /// call frame's parameter and result slots.
    pub fn zero(value_type: ValueType) -> Value {
        match value_type {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = ExecutionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::I32(v) => Ok(v),
            got => Err(ExecutionError::WrongType { expected: "i32", got }),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_match_declared_type() {
        assert_eq!(Value::zero(ValueType::I32), Value::I32(0));
        assert_eq!(Value::zero(ValueType::I64), Value::I64(0));
        assert_eq!(Value::zero(ValueType::F32), Value::F32(0.0));
        assert_eq!(Value::zero(ValueType::F64), Value::F64(0.0));
    }

    #[test]
    fn i32_conversion_rejects_other_tags() {
        let err = i32::try_from(Value::I64(1)).unwrap_err();
        assert!(matches!(err, ExecutionError::WrongType { expected: "i32", .. }));
    }
}
