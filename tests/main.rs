use std::{
    fs,
    path::{Path, PathBuf},
};

use address_string::{EvaluationError, Evaluator, ResolutionTables};
use colored::Colorize;
use lazy_static::lazy_static;
use libtest_mimic::{self, run_tests, Arguments, Outcome, Test};
use miette::{IntoDiagnostic, Result};
use regex::Regex;

fn main() {
    let tests = read_all_files("test_fixtures".to_string().into())
        .unwrap()
        .into_iter()
        .filter(|path| path.extension().map_or(false, |ext| ext == "addr"))
        .map(|path| Test {
            name: path.to_string_lossy().into(),
            kind: "fixture".into(),
            is_bench: false,
            is_ignored: false,
            data: path,
        })
        .collect::<Vec<_>>();

    run_tests(&Arguments::from_args(), tests, |test| {
        match run_test(&test.data) {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failed {
                msg: Some(format!("{:?}", err)),
            },
        }
    })
    .exit();
}

lazy_static! {
    static ref CASE_RE: Regex = Regex::new(r"^(?P<source>.*?)\s+=>\s+(?P<expected>.*?)\s*$").unwrap();
    static ref COMMENT_RE: Regex = Regex::new(r"^\s*(#.*)?$").unwrap();
}

/// One `<address string> => <expected>` line of a fixture.
struct Case {
    line_number: usize,
    source: String,
    expected: String,
    actual: String,
}

/// Each non-comment line of a fixture is `<address string> => <expected>`,
/// where expected is either `0xHEX` or `<Kind>Error: <message>`.
fn run_test(path: &Path) -> Result<Outcome> {
    let fixture = fs::read_to_string(path).into_diagnostic()?;
    let tables = ResolutionTables::sample();
    let evaluator = Evaluator::new(&tables);

    let mut cases = Vec::new();
    for (row, line) in fixture.lines().enumerate() {
        if COMMENT_RE.is_match(line) {
            continue;
        }
        let captures = match CASE_RE.captures(line) {
            Some(captures) => captures,
            None => {
                return Ok(Outcome::Failed {
                    msg: Some(format!("{}:{}: malformed case {:?}", path.display(), row + 1, line)),
                })
            }
        };
        let source = &captures["source"];
        cases.push(Case {
            line_number: row + 1,
            source: source.to_string(),
            expected: captures["expected"].to_string(),
            actual: fmt_result(evaluator.evaluate(source)),
        });
    }

    Ok(compare_cases(path, &cases))
}

fn fmt_result(result: Result<u64, EvaluationError>) -> String {
    match result {
        Ok(address) => format!("0x{:X}", address),
        Err(err) => format!("{}: {}", err.kind(), err),
    }
}

/// Passes when every case matches. Otherwise lists each mismatch under its
/// fixture line number, followed by a count.
fn compare_cases(path: &Path, cases: &[Case]) -> Outcome {
    let failures: Vec<&Case> = cases.iter().filter(|case| case.expected != case.actual).collect();
    if failures.is_empty() {
        return Outcome::Passed;
    }

    let width = failures
        .iter()
        .map(|case| case.expected.len())
        .max()
        .unwrap_or(0)
        .max("expected".len());
    let mut output = format!(
        "{} | {:width$} | {}\n",
        "case".bold(),
        "expected".bold(),
        "actual".bold()
    );
    for case in &failures {
        output.push_str(&format!(
            "{} {} | {:width$} | {}\n",
            format!("{}:{}", path.display(), case.line_number).dimmed(),
            case.source,
            case.expected.green(),
            case.actual.red(),
        ));
    }
    output.push_str(&format!("{} of {} cases failed\n", failures.len(), cases.len()));
    Outcome::Failed { msg: Some(output) }
}

fn read_all_files(prefix: PathBuf) -> Result<Vec<PathBuf>> {
    let mut results = Vec::<PathBuf>::new();
    read_children(prefix, &mut results)?;
    results.sort();
    return Ok(results);

    fn read_children(prefix: PathBuf, results: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(prefix).into_diagnostic()? {
            let entry = entry.into_diagnostic()?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().into_diagnostic()?.is_dir() {
                read_children(entry.path(), results)?;
            } else {
                results.push(entry.path())
            }
        }
        Ok(())
    }
}
