//! C5: the JSON-RPC proxy. A long-lived, line-framed JSON-RPC 2.0 subset
//! over stdin/stdout (spec §4.5). Sequential, synchronous, no suspension
//! points beyond the blocking stdin read (spec §5).

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Verdict;
use crate::facade::Filter;
use crate::operation::Operation;

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CheckParams {
    op: String,
    path: String,
    #[serde(default)]
    base_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckManyParams {
    op: String,
    paths: Vec<String>,
    #[serde(default)]
    base_dir: Option<String>,
}

/// Run the proxy loop: read one JSON-RPC request per line from `input`,
/// write one response per line to `output`, until EOF or `shutdown`.
pub fn run<R: BufRead, W: Write>(
    filter: &Filter,
    mut input: R,
    mut output: W,
) -> std::io::Result<()> {
    tracing::info!("json-rpc proxy starting");
    let mut line = String::new();

    loop {
        line.clear();
        let read = input.read_line(&mut line)?;
        if read == 0 {
            tracing::info!("stdin closed, shutting down");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let req = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "malformed JSON-RPC request");
                write_response(
                    &mut output,
                    &Response {
                        jsonrpc: "2.0",
                        id: Value::Null,
                        result: None,
                        error: Some(RpcError {
                            code: PARSE_ERROR,
                            message: format!("parse error: {e}"),
                        }),
                    },
                )?;
                continue;
            }
        };

        tracing::debug!(method = %req.method, "received request");
        let is_notification = req.id.is_none();

        if req.method == "shutdown" {
            tracing::info!("shutdown requested");
            if let Some(id) = req.id {
                write_response(
                    &mut output,
                    &Response {
                        jsonrpc: "2.0",
                        id,
                        result: Some(Value::String("ok".into())),
                        error: None,
                    },
                )?;
            }
            break;
        }

        // Notifications never get a response, per the JSON-RPC 2.0
        // notification contract (spec §4.5).
        if let Some(response) = handle(filter, req) {
            if !is_notification {
                write_response(&mut output, &response)?;
            }
        }
    }

    Ok(())
}

/// Dispatch a known/unknown method. Returns `None` only when the caller
/// should skip writing a response regardless of notification status (no
/// case currently does this; kept for symmetry with `run`'s check).
fn handle(filter: &Filter, req: Request) -> Option<Response> {
    let id = req.id.clone().unwrap_or(Value::Null);

    let result = match req.method.as_str() {
        "check" => serde_json::from_value::<CheckParams>(req.params)
            .map_err(|e| format!("invalid params: {e}"))
            .and_then(|p| {
                let op = p
                    .op
                    .parse::<Operation>()
                    .map_err(|e| format!("invalid op: {e}"))?;
                Ok((op, p))
            })
            .map(|(op, p)| {
                let base = p.base_dir.as_ref().map(PathBuf::from);
                let decision = filter.check(op, &p.path, base.as_deref());
                serde_json::json!({
                    "verdict": verdict_str(decision.verdict),
                    "reason": decision.reason,
                    "level": decision.level.map(|l| l.to_string()),
                })
            }),
        "check_many" => serde_json::from_value::<CheckManyParams>(req.params)
            .map_err(|e| format!("invalid params: {e}"))
            .and_then(|p| {
                let op = p
                    .op
                    .parse::<Operation>()
                    .map_err(|e| format!("invalid op: {e}"))?;
                Ok((op, p))
            })
            .map(|(op, p)| {
                let base = p.base_dir.as_ref().map(PathBuf::from);
                let batch = filter.check_many(op, &p.paths, base.as_deref());
                let details: Vec<Value> = batch
                    .details
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "path": d.path,
                            "verdict": verdict_str(d.decision.verdict),
                            "reason": d.decision.reason,
                            "level": d.decision.level.map(|l| l.to_string()),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "verdict": verdict_str(batch.verdict),
                    "reason": batch
                        .first_deny()
                        .map(|d| d.decision.reason.clone())
                        .unwrap_or_else(|| "all paths pass".to_string()),
                    "details": details,
                })
            }),
        other => {
            return Some(Response {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(RpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("method not found: {other}"),
                }),
            });
        }
    };

    // Internal facade errors never surface as JSON-RPC errors -- they
    // become successful deny responses so the wire preserves fail-closed
    // semantics (spec §4.5). Only bad params surface as a plain deny too,
    // since there's no request to misinterpret otherwise.
    Some(match result {
        Ok(value) => Response {
            jsonrpc: "2.0",
            id,
            result: Some(value),
            error: None,
        },
        Err(reason) => Response {
            jsonrpc: "2.0",
            id,
            result: Some(serde_json::json!({
                "verdict": "deny",
                "reason": reason,
                "level": Value::Null,
            })),
            error: None,
        },
    })
}

fn verdict_str(v: Verdict) -> &'static str {
    match v {
        Verdict::Pass => "pass",
        Verdict::Deny => "deny",
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> std::io::Result<()> {
    let line = serde_json::to_string(response)?;
    writeln!(output, "{line}")?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use std::io::Cursor;

    fn filter() -> Filter {
        Filter::new(Catalog::build().unwrap())
    }

    fn run_lines(input: &str) -> Vec<Value> {
        let f = filter();
        let mut out = Vec::new();
        run(&f, Cursor::new(input.as_bytes()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn check_pass_for_ordinary_path() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.txt");
        std::fs::write(&f, "x").unwrap();
        let req = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"check","params":{{"op":"read","path":"{}"}}}}"#,
            f.display()
        );
        let responses = run_lines(&req);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"]["verdict"], "pass");
    }

    #[test]
    fn check_deny_for_ssh_key() {
        let dir = tempfile::tempdir().unwrap();
        let ssh = dir.path().join(".ssh");
        std::fs::create_dir_all(&ssh).unwrap();
        let key = ssh.join("id_ed25519");
        std::fs::write(&key, "x").unwrap();
        let req = format!(
            r#"{{"jsonrpc":"2.0","id":7,"method":"check","params":{{"op":"read","path":"{}"}}}}"#,
            key.display()
        );
        let responses = run_lines(&req);
        assert_eq!(responses[0]["result"]["verdict"], "deny");
        assert_eq!(responses[0]["id"], 7);
    }

    #[test]
    fn malformed_json_gets_parse_error() {
        let responses = run_lines("not json\n");
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn unknown_method_gets_method_not_found() {
        let responses = run_lines(r#"{"jsonrpc":"2.0","id":1,"method":"frobnicate"}"#);
        assert_eq!(responses[0]["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn shutdown_terminates_loop() {
        let f = filter();
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"shutdown\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"check\",\"params\":{\"op\":\"read\",\"path\":\"/tmp\"}}\n";
        let mut out = Vec::new();
        run(&f, Cursor::new(input.as_bytes()), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Only the shutdown response should have been written; the
        // second line is never processed.
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn check_many_reports_first_deny_and_full_details() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("a.txt");
        std::fs::write(&ok, "x").unwrap();
        let env = dir.path().join(".env");
        std::fs::write(&env, "x").unwrap();

        let req = format!(
            r#"{{"jsonrpc":"2.0","id":3,"method":"check_many","params":{{"op":"read","paths":["{}","{}"]}}}}"#,
            ok.display(),
            env.display()
        );
        let responses = run_lines(&req);
        assert_eq!(responses[0]["result"]["verdict"], "deny");
        assert_eq!(responses[0]["result"]["details"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn notification_without_id_gets_no_response_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.txt");
        std::fs::write(&f, "x").unwrap();
        let req = format!(
            r#"{{"jsonrpc":"2.0","method":"check","params":{{"op":"read","path":"{}"}}}}"#,
            f.display()
        );
        let responses = run_lines(&req);
        assert!(responses.is_empty());
    }
}
