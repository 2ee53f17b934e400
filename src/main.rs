use std::{env, fs, process};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

use wasm_stack_runtime::exec::{Runtime, Value};
use wasm_stack_runtime::parse::Parser;

fn main() {
    Registry::default().with(tracing_tree::HierarchicalLayer::new(2)).init();

    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: wasm_stack_runtime <file.wasm> <export> [i32 args...]");
            process::exit(2);
        }
    };
    let export_name = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("usage: wasm_stack_runtime <file.wasm> <export> [i32 args...]");
            process::exit(2);
        }
    };
    let call_args: Vec<Value> = args
        .map(|arg| {
            arg.parse::<i32>().unwrap_or_else(|_| {
                eprintln!("argument {arg:?} is not a valid i32");
                process::exit(2);
            })
        })
        .map(Value::I32)
        .collect();

    let bytes = fs::read(&path).unwrap_or_else(|err| {
        eprintln!("failed to read {path}: {err}");
        process::exit(1);
    });

    let module = Parser::new(&bytes).parse_module().unwrap_or_else(|err| {
        eprintln!("failed to parse {path}: {err}");
        process::exit(1);
    });

    let runtime = Runtime::new(module);
    let invocable = runtime.get(&export_name).unwrap_or_else(|| {
        eprintln!("no export named {export_name:?}; available exports:");
        for name in runtime.exported_names() {
            let signature = runtime.get(name).expect("name came from exported_names").signature();
            eprintln!("  {name} {signature}");
        }
        process::exit(1);
    });

    match invocable.call(call_args) {
        Ok(results) => println!("{results:?}"),
        Err(err) => {
            eprintln!("{export_name} failed: {err}");
            process::exit(1);
        }
    }
}
