use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io;
use std::panic;
use std::path::Path;
use std::process;
use tinyscm::builtinops::builtin_ops;
use tinyscm::driver::{Session, UnitBuffer};
use tinyscm::evaluator::{EvalConfig, Namespace};
use tinyscm::reader::ReaderConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    let mut session = Session::with_config(EvalConfig {
        reader: ReaderConfig {
            handle_comments: true,
        },
        ..EvalConfig::default()
    });

    // Files named on the command line run before the prompt appears
    for path in std::env::args().skip(1) {
        _ = session.load(Path::new(&path), &mut io::stdout());
    }

    println!("Entering Scheme interpreter. Type Ctrl+D to exit");
    println!("Type :help for more commands.");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize REPL: {err}");
            process::exit(1);
        }
    };
    let mut buffer = UnitBuffer::new();

    loop {
        let prompt = if buffer.is_pending() { ". " } else { "> " };
        match rl.readline(prompt) {
            Ok(line) => {
                if !buffer.is_pending() {
                    match line.trim() {
                        "" => continue,
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(session.namespace());
                            continue;
                        }
                        ":quit" | ":exit" => break,
                        _ => {}
                    }
                }

                let Some(unit) = buffer.push_line(&line) else {
                    continue;
                };
                let _ = rl.add_history_entry(unit.trim_end());

                // Errors are already reported on stdout
                _ = session.run(&unit, &mut io::stdout());
            }

            Err(ReadlineError::Interrupted) => {
                // Abandon a half-typed unit
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }

    println!("\nexiting scheme");
}

fn print_help() {
    println!("tinyscm interpreter:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current namespace bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  Ctrl+D     - Exit the interpreter");
    println!("  Ctrl+C     - Discard a partially entered expression");
    println!();
    println!("Input continues on '. ' lines until parentheses balance.");
    println!("Comments start with ';' and run to the end of the line.");
    println!();
    println!("Built-in forms and procedures:");
    let names: Vec<&str> = builtin_ops().iter().map(|op| op.id).collect();
    for row in names.chunks(6) {
        let row: Vec<String> = row.iter().map(|name| format!("{name:<12}")).collect();
        println!("  {}", row.join("").trim_end());
    }
    println!();
    println!("Examples:");
    println!("  (define square (lambda (x) (* x x)))");
    println!("  (square 12)");
    println!("  (load \"prelude.scm\")");
    println!();
}

fn print_environment(ns: &Namespace<'_>) {
    let bindings = ns.bindings();

    if bindings.is_empty() {
        println!("Namespace is empty.");
        return;
    }

    println!("Namespace bindings ({} total):", bindings.len());
    for binding in bindings {
        match binding.value() {
            Some(value) => println!("  {} = {value}", binding.name()),
            None => println!("  {} (undefined)", binding.name()),
        }
    }
}
