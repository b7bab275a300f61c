use std::fs;
use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result};
use argh::FromArgs;
use log::info;
use mvu_rust::error::SkippedCall;
use mvu_rust::{extract_with_diagnostics, CommandStatus, Interpreter, Options, Outcome};
use serde_json::{json, Value};

/// Apply `_.set(...)`-style mutation scripts to a JSON state file.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Subcommand,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Subcommand {
    Apply(ApplyArgs),
    Extract(ExtractArgs),
}

/// Apply a script to a state wrapper. Prints the new state and exits 0 when
/// something changed; prints nothing and exits 1 otherwise.
#[derive(FromArgs)]
#[argh(subcommand, name = "apply")]
struct ApplyArgs {
    /// JSON file holding the state wrapper
    #[argh(option)]
    state: String,

    /// script file (default: stdin)
    #[argh(option)]
    script: Option<String>,

    /// wrapper key of the mutable sub-tree (default: statData)
    #[argh(option)]
    root: Option<String>,

    /// print a per-command report to stderr
    #[argh(switch)]
    report: bool,
}

/// List the commands found in a script, plus skipped call sites.
#[derive(FromArgs)]
#[argh(subcommand, name = "extract")]
struct ExtractArgs {
    /// script file (default: stdin)
    #[argh(option)]
    script: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli: Cli = argh::from_env();
    let result = match cli.command {
        Subcommand::Apply(args) => run_apply(args),
        Subcommand::Extract(args) => run_extract(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(2);
        }
    }
}

fn read_script(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("unable to read '{}'", path)),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("unable to read script from stdin")?;
            Ok(input)
        }
    }
}

fn run_apply(args: ApplyArgs) -> Result<i32> {
    let state_text = fs::read_to_string(&args.state)
        .with_context(|| format!("unable to read '{}'", args.state))?;
    let state: Value = serde_json::from_str(&state_text)
        .with_context(|| format!("'{}' is not valid JSON", args.state))?;
    let script = read_script(args.script.as_deref())?;

    let mut options = Options::default();
    if let Some(root) = args.root {
        options.root_key = root;
    }
    let interpreter = Interpreter::new(options);
    let (outcome, reports) = interpreter.apply_with_report(&script, &state);

    if args.report {
        for report in &reports {
            let status = match &report.status {
                CommandStatus::Applied => "applied".to_string(),
                CommandStatus::NoOp => "no-op".to_string(),
                CommandStatus::Failed(err) => format!("failed: {}", err),
            };
            eprintln!(
                "_.{}({}) -> {}",
                report.command.verb,
                report.command.raw_args.join(", "),
                status
            );
        }
    }

    match outcome {
        Outcome::Changed(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Outcome::NoChange => {
            info!("script produced no change");
            Ok(1)
        }
    }
}

fn run_extract(args: ExtractArgs) -> Result<i32> {
    let script = read_script(args.script.as_deref())?;
    let extraction = extract_with_diagnostics(&script);

    let commands: Vec<Value> = extraction
        .commands
        .iter()
        .map(|c| json!({ "verb": c.verb.name(), "args": c.raw_args }))
        .collect();
    let skipped: Vec<Value> = extraction.skipped.iter().map(skipped_to_json).collect();

    let out = json!({ "commands": commands, "skipped": skipped });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}

fn skipped_to_json(skipped: &SkippedCall) -> Value {
    json!({
        "verb": skipped.verb.name(),
        "code": skipped.reason.code(),
        "begin": {
            "line": skipped.begin.line,
            "column": skipped.begin.column,
            "offset": skipped.begin.offset,
        },
    })
}
