//! C6: the hook adapter. A one-shot process reading a single JSON
//! envelope from stdin, invoking the facade, and emitting an exit code
//! plus a human-readable reason (spec §4.6, §6).

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::Verdict;
use crate::facade::{format_deny_message, Filter};
use crate::operation::Operation;

/// Hook format selector for multi-ecosystem support (SPEC_FULL §10.4):
/// Claude Code's `PreToolUse` hook and Gemini CLI's `BeforeTool` hook
/// speak slightly different wire shapes for the same decision.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum HookFormat {
    #[default]
    Claude,
    Gemini,
}

/// The JSON payload the adapter reads from stdin (spec §6). Extra
/// Gemini-specific fields are accepted and ignored on the Claude path via
/// `#[serde(default)]`.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub cwd: String,
    #[serde(default)]
    pub permission_mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClaudeHookOutput {
    #[serde(rename = "hookSpecificOutput")]
    hook_specific_output: ClaudeHookSpecificOutput,
}

#[derive(Debug, Serialize)]
struct ClaudeHookSpecificOutput {
    #[serde(rename = "permissionDecision")]
    permission_decision: &'static str,
}

#[derive(Debug, Serialize)]
struct GeminiHookOutput {
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Result of running the hook adapter once: what to print on stdout, what
/// to print on stderr (if anything), and the process exit code.
pub struct HookResult {
    pub stdout: String,
    pub stderr: Option<String>,
    pub exit_code: i32,
}

/// Run the hook adapter end to end against an already-parsed envelope.
pub fn evaluate(filter: &Filter, input: &HookInput, format: HookFormat) -> HookResult {
    let Some(op) = Operation::from_tool_name(&input.tool_name) else {
        // Unknown tool: nothing this filter governs, allow it through.
        return HookResult {
            stdout: render_output(Verdict::Pass, None, format),
            stderr: None,
            exit_code: 0,
        };
    };

    let raw_paths = extract_paths(&input.tool_name, &input.tool_input);
    if raw_paths.is_empty() {
        return HookResult {
            stdout: render_output(Verdict::Pass, None, format),
            stderr: None,
            exit_code: 0,
        };
    }

    let base_dir = PathBuf::from(&input.cwd);
    let batch = filter.check_many(op, &raw_paths, Some(base_dir.as_path()));

    match batch.first_deny() {
        Some(denied) => {
            let message = format!(
                "{} (path: {})",
                format_deny_message(&denied.decision),
                denied.path
            );
            HookResult {
                stdout: render_output(Verdict::Deny, Some(message.clone()), format),
                stderr: Some(message),
                exit_code: deny_exit_code(format),
            }
        }
        None => HookResult {
            stdout: render_output(Verdict::Pass, None, format),
            stderr: None,
            exit_code: 0,
        },
    }
}

fn render_output(verdict: Verdict, reason: Option<String>, format: HookFormat) -> String {
    match format {
        HookFormat::Claude => {
            let output = ClaudeHookOutput {
                hook_specific_output: ClaudeHookSpecificOutput {
                    permission_decision: match verdict {
                        Verdict::Pass => "allow",
                        Verdict::Deny => "deny",
                    },
                },
            };
            serde_json::to_string(&output).expect("serializable output")
        }
        HookFormat::Gemini => {
            let output = GeminiHookOutput {
                decision: match verdict {
                    Verdict::Pass => "allow",
                    Verdict::Deny => "deny",
                },
                reason,
            };
            serde_json::to_string(&output).expect("serializable output")
        }
    }
}

/// Claude uses exit code 2 for a deny from `PreToolUse`; Gemini's
/// `BeforeTool` emergency block is also exit 2. Both adapters share the
/// same non-zero deny code here, matching spec §6.
fn deny_exit_code(_format: HookFormat) -> i32 {
    2
}

/// Extract candidate paths from tool input depending on tool type
/// (spec §4.6's table).
fn extract_paths(tool_name: &str, tool_input: &serde_json::Value) -> Vec<String> {
    match tool_name {
        "Read" | "Write" | "Edit" | "MultiEdit" => tool_input
            .get("file_path")
            .and_then(|v| v.as_str())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        "NotebookEdit" => tool_input
            .get("notebook_path")
            .and_then(|v| v.as_str())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        "Glob" | "Grep" => tool_input
            .get("path")
            .and_then(|v| v.as_str())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        "Bash" => {
            let command = tool_input.get("command").and_then(|v| v.as_str()).unwrap_or("");
            let mut paths = extract_bash_paths(command);
            paths.extend(assignment_targets(command).into_iter().filter(|t| looks_like_path(t)));
            paths
        }
        _ => Vec::new(),
    }
}

/// Tokenize a shell command into candidate path-like tokens (spec §9
/// Design Notes: "non-trivial parse"; over-production is safe since it
/// only makes the filter stricter). Grounded in the pack's shell path
/// extractors: tokenize with respect to single/double quoting, then keep
/// tokens that look like paths (contain `/`, or start with `~` or `.`).
fn extract_bash_paths(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = command.chars().peekable();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
            }
            '"' if !in_single => {
                in_double = !in_double;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                flush(&mut current, &mut tokens);
            }
            '|' | '&' | ';' if !in_single && !in_double => {
                flush(&mut current, &mut tokens);
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);

    tokens
        .into_iter()
        .filter(|t| looks_like_path(t))
        .filter(|t| t != "/dev/null")
        .collect()
}

fn looks_like_path(token: &str) -> bool {
    if token.starts_with('-') {
        return false;
    }
    // Drop flag-style and redirect-operator-only tokens (`-rf`, `2>`, `>`).
    let stripped = token.trim_start_matches(['>', '<']);
    if stripped.is_empty() {
        return false;
    }
    stripped.starts_with('/')
        || stripped.starts_with('~')
        || stripped.starts_with('.')
        || stripped.contains('/')
}

/// Matches assignment-style redirect targets even when glued to the
/// previous token (e.g. `dd of=/etc/passwd`); kept as a secondary pass
/// since the tokenizer above only splits on whitespace/quotes/operators.
pub(crate) fn assignment_targets(command: &str) -> Vec<String> {
    static_pattern()
        .captures_iter(command)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn static_pattern() -> Regex {
    Regex::new(r"(?:^|\s)\w+=(\S+)").expect("static regex")
}
