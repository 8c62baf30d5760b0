//! CLI surface (SPEC_FULL §10.4): a one-shot `--check`, a `hook` adapter
//! subcommand, and a default proxy mode when neither is given.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::{Catalog, Verdict};
use crate::error::Result;
use crate::facade::{format_deny_message, Filter};
use crate::hook::{self, HookFormat, HookInput};
use crate::operation::Operation;
use crate::rpc;

#[derive(Parser)]
#[command(name = "pathgate")]
#[command(about = "Path-access security filter for AI coding agent tool calls")]
#[command(version)]
pub struct Cli {
    /// One-shot check: evaluate a single path and print pass/deny.
    #[arg(long, value_name = "PATH", conflicts_with = "command")]
    pub check: Option<String>,

    /// Operation to evaluate `--check` under.
    #[arg(long, value_enum, default_value = "read")]
    pub op: Operation,

    /// Base directory relative paths are resolved against, for `--check`.
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one tool call from stdin (hook mode), per spec §4.6.
    Hook {
        /// Output format: claude (default) or gemini.
        #[arg(long, value_enum, default_value = "claude")]
        format: HookFormat,
    },
}

/// Dispatch the parsed CLI. Returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let catalog = Catalog::build()?;
    let filter = Filter::new(catalog);

    if let Some(path) = cli.check {
        return Ok(run_check(&filter, cli.op, &path, cli.base_dir.as_deref()));
    }

    match cli.command {
        Some(Commands::Hook { format }) => run_hook(&filter, format),
        None => {
            let stdin = io::stdin();
            rpc::run(&filter, stdin.lock(), io::stdout())?;
            Ok(0)
        }
    }
}

fn run_check(filter: &Filter, op: Operation, path: &str, base_dir: Option<&std::path::Path>) -> i32 {
    let decision = filter.check(op, path, base_dir);
    match decision.verdict {
        Verdict::Pass => {
            println!("Decision: pass");
            println!("Reason: {}", decision.reason);
            0
        }
        Verdict::Deny => {
            println!("Decision: deny");
            println!("Reason: {}", decision.reason);
            eprintln!("{}", format_deny_message(&decision));
            2
        }
    }
}

fn run_hook(filter: &Filter, format: HookFormat) -> Result<i32> {
    let mut raw = String::new();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        raw.push_str(&line?);
        raw.push('\n');
    }

    let input: HookInput = match serde_json::from_str(raw.trim()) {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!(error = %e, "malformed hook input, denying");
            eprintln!("Blocked by policy: malformed hook input: {e}");
            return Ok(1);
        }
    };

    let result = hook::evaluate(filter, &input, format);
    println!("{}", result.stdout);
    if let Some(stderr) = &result.stderr {
        eprintln!("{stderr}");
    }
    io::stdout().flush()?;
    Ok(result.exit_code)
}
