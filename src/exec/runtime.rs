use std::collections::HashMap;
use std::sync::Arc;

use crate::exec::error::ExecutionError;
use crate::exec::frame;
use crate::exec::value::Value;
use crate::parse::types::{ExportKind, Module};

/// A single exported function, callable by value. Cloning an `Invocable` is
/// cheap — an `Arc` clone of the module plus a function index — so a
/// `Runtime` can hand out independent invocables to separate threads:
/// `spec.md` §5 allows concurrent invocation of independent call frames once
/// the module is loaded, since the decoded module carries no mutable state.
#[derive(Clone)]
pub struct Invocable {
    module: Arc<Module>,
    function_index: usize,
}

impl Invocable {
    pub fn call(&self, args: Vec<Value>) -> Result<Vec<Value>, ExecutionError> {
        frame::invoke(&self.module, self.function_index, args)
    }

    pub fn function_index(&self) -> usize {
        self.function_index
    }

    pub fn signature(&self) -> &crate::parse::types::FunctionSignature {
        &self.module.functions[self.function_index].signature
    }
}

/// Builds the exported-function table from a decoded module: a
/// name → invocable mapping. `Module`'s linker pass already guarantees every
/// function export's index is in bounds, so building this table cannot fail.
pub struct Runtime {
    exported: HashMap<String, Invocable>,
}

impl Runtime {
    pub fn new(module: Module) -> Self {
        let module = Arc::new(module);
        let mut exported = HashMap::new();
        for export in &module.exports {
            if export.kind == ExportKind::Function {
                exported.insert(
                    export.name.clone(),
                    Invocable { module: module.clone(), function_index: export.index },
                );
            }
        }
        Self { exported }
    }

    pub fn get(&self, name: &str) -> Option<&Invocable> {
        self.exported.get(name)
    }

    pub fn exported_names(&self) -> impl Iterator<Item = &str> {
        self.exported.keys().map(String::as_str)
    }
}
