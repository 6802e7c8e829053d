//! The `fallen` command line tool: `parse`, `build`, `run` and `repl`
//! subcommands, plus `--debug` to surface the host-side error representation
//! alongside the Fallen one.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::{env, fs};

use fallen::{compile_source, parse_source, pretty, Error, StdSink, Unit, Vm};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  fallen parse <file.fallen>");
    eprintln!("  fallen build <file.fallen>");
    eprintln!("  fallen run <file.fallen> [-- script args]");
    eprintln!("  fallen repl");
    eprintln!("  (optional) --debug to show the host error representation");
}

fn main() -> ExitCode {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let debug = if let Some(pos) = args.iter().position(|a| a == "--debug") {
        args.remove(pos);
        true
    } else {
        false
    };

    let Some(command) = args.first().cloned() else {
        print_usage();
        return ExitCode::FAILURE;
    };

    match command.as_str() {
        "repl" => {
            if args.len() != 1 {
                print_usage();
                return ExitCode::FAILURE;
            }
            run_repl(debug)
        }
        "parse" | "build" | "run" => {
            let Some(path) = args.get(1).cloned() else {
                print_usage();
                return ExitCode::FAILURE;
            };
            let extra = &args[2..];
            match command.as_str() {
                "parse" => cmd_parse(&path, extra, debug),
                "build" => cmd_build(&path, extra, debug),
                _ => cmd_run(&path, extra, debug),
            }
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn report(err: &Error, debug: bool) {
    eprintln!("{err}");
    if debug {
        eprintln!("{err:?}");
    }
}

fn read_program(path: &str) -> Result<(String, PathBuf), String> {
    let abs = fs::canonicalize(path).map_err(|e| format!("Cannot read file \"{path}\": {e}"))?;
    let source = fs::read_to_string(&abs).map_err(|e| format!("Cannot read file \"{path}\": {e}"))?;
    Ok((source, abs))
}

fn cmd_parse(path: &str, extra: &[String], debug: bool) -> ExitCode {
    if !extra.is_empty() {
        eprintln!("parse does not accept extra arguments");
        return ExitCode::FAILURE;
    }
    let (source, abs) = match read_program(path) {
        Ok(read) => read,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    match parse_source(&source, &abs.to_string_lossy()) {
        Ok(program) => {
            print!("{}", pretty(&program));
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err, debug);
            ExitCode::FAILURE
        }
    }
}

fn cmd_build(path: &str, extra: &[String], debug: bool) -> ExitCode {
    if !extra.is_empty() {
        eprintln!("build does not accept extra arguments");
        return ExitCode::FAILURE;
    }
    let (source, abs) = match read_program(path) {
        Ok(read) => read,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    match compile_source(&source, &abs.to_string_lossy()) {
        Ok(unit) => {
            print!("{}", unit.listing());
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err, debug);
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(path: &str, extra: &[String], debug: bool) -> ExitCode {
    // everything after `--` goes to the script's args() builtin
    let script_args: Vec<String> = match extra.iter().position(|a| a == "--") {
        Some(pos) => extra[pos + 1..].to_vec(),
        None => Vec::new(),
    };
    let (source, abs) = match read_program(path) {
        Ok(read) => read,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let unit = match compile_source(&source, &abs.to_string_lossy()) {
        Ok(unit) => Rc::new(unit),
        Err(err) => {
            report(&err, debug);
            return ExitCode::FAILURE;
        }
    };
    let base_dir = abs.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let mut vm = Vm::new(base_dir, StdSink);
    vm.set_argv(script_args);
    match vm.run_unit(&unit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, debug);
            ExitCode::FAILURE
        }
    }
}

/// Counts the brace-depth change of a REPL line, ignoring braces inside
/// string literals and comments.
fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '#' => break,
            '"' => in_string = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Compiles one REPL input: statements first, falling back to a single
/// expression wrapped in `write(...)` so `2 + 3` echoes `5`.
fn compile_repl_input(source: &str) -> Result<Unit, Error> {
    match compile_source(source, "<repl>") {
        Ok(unit) => Ok(unit),
        Err(stmt_err) => match fallen::compile_repl_expression(source, "<repl>") {
            Ok(unit) => Ok(unit),
            Err(_) => Err(stmt_err),
        },
    }
}

fn run_repl(debug: bool) -> ExitCode {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to start line editor: {err}");
            return ExitCode::FAILURE;
        }
    };
    let history_path = env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".fallen_history"));
    if let Some(path) = history_path.as_ref() {
        let _ = editor.load_history(path);
    }

    let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut vm = Vm::new(base_dir, StdSink);

    println!("Fallen REPL. Type :q to quit.");

    let mut buffer = String::new();
    let mut depth = 0i32;
    loop {
        let prompt = if buffer.is_empty() { "fallen> " } else { "...> " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted | rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Input error: {err}");
                break;
            }
        };

        let trimmed = line.trim();
        if buffer.is_empty() && matches!(trimmed, ":q" | ":quit" | "quit" | "exit") {
            break;
        }
        if trimmed.is_empty() && buffer.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        buffer.push_str(&line);
        buffer.push('\n');
        depth += brace_delta(&line);
        if depth > 0 {
            continue;
        }

        let source = std::mem::take(&mut buffer);
        depth = 0;

        match compile_repl_input(&source) {
            Ok(unit) => {
                if let Err(err) = vm.run_unit(&Rc::new(unit)) {
                    report(&err, debug);
                }
            }
            Err(err) => report(&err, debug),
        }
    }

    if let Some(path) = history_path.as_ref() {
        let _ = editor.append_history(path);
    }
    ExitCode::SUCCESS
}
