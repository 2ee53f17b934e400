//! The stack-based interpreter (component 5 of `spec.md` §2) and the runtime
//! facade that exposes a module's exported functions (component 6).

pub mod error;
pub mod frame;
pub mod opcode;
pub mod operand_stack;
pub mod runtime;
pub mod value;

pub use error::ExecutionError;
pub use frame::{invoke, CallFrame};
pub use opcode::Opcode;
pub use operand_stack::OperandStack;
pub use runtime::{Invocable, Runtime};
pub use value::Value;
