use colored::Colorize;
use miette::{IntoDiagnostic, Report, Result};
use rustyline::error::ReadlineError;

use address_string::{parse, EvaluationError, Evaluator, ResolutionTables};

#[derive(Default, Clone, Copy)]
struct Opts {
    show_ast: bool,
    plain: bool,
}

fn main() -> Result<()> {
    let mut args: Vec<_> = std::env::args().skip(1).collect();
    let opts = Opts {
        show_ast: take_flag(&mut args, "--ast"),
        plain: take_flag(&mut args, "--plain"),
    };
    let file = take_file(&mut args);
    if !args.is_empty() {
        eprintln!("Unrecognized arguments: {:?}", args);
        eprintln!("Usage: address-string [--ast] [--plain] [file]");
        std::process::exit(1);
    }

    let tables = ResolutionTables::sample();
    let evaluator = Evaluator::new(&tables);
    if let Some(file) = file {
        run_file(&evaluator, file, opts)
    } else {
        run_prompt(&evaluator, opts)
    }
}

/// Removes every occurrence of `flag`, reporting whether there was one.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|arg| arg != flag);
    args.len() != before
}

/// The first argument that is not a flag names the file to evaluate.
fn take_file(args: &mut Vec<String>) -> Option<String> {
    let idx = args.iter().position(|arg| !arg.starts_with("--"))?;
    Some(args.remove(idx))
}

fn report_error(error: EvaluationError, opts: Opts) {
    if opts.plain {
        println!("{}", error.report());
    } else {
        println!("{:?}", Report::new(error));
    }
}

fn eval_line(evaluator: &Evaluator, name: &str, line: &str, opts: Opts) {
    if opts.show_ast {
        match parse(line) {
            Ok(expr) => println!("{} {}", "ast:".dimmed(), expr),
            Err(error) => return report_error(error, opts),
        }
    }
    match evaluator.evaluate_named(name, line) {
        Ok(address) => println!("==> {}", format!("0x{:X}", address).green()),
        Err(error) => report_error(error, opts),
    }
}

fn run_file(evaluator: &Evaluator, file_name: String, opts: Opts) -> Result<()> {
    let path = std::fs::canonicalize(file_name).into_diagnostic()?;
    let source = std::fs::read_to_string(&path).into_diagnostic()?;
    let path = path.to_string_lossy();

    for (row, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", line);
        eval_line(evaluator, &format!("{}:{}", path, row + 1), line, opts);
    }

    Ok(())
}

fn run_prompt(evaluator: &Evaluator, opts: Opts) -> Result<()> {
    let mut rl = rustyline::Editor::<()>::new();
    let mut repl_line: usize = 1;
    loop {
        match rl.readline(&format!("{}> ", repl_line)) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str());
                    eval_line(evaluator, &format!("<repl-{}>", repl_line), &line, opts);
                }
            }
            Err(ReadlineError::Interrupted) => return Ok(()),
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err).into_diagnostic(),
        }
        repl_line += 1;
    }
}
