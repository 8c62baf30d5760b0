//! C4: the filter facade. Glue: canonicalize -> match -> resolve ->
//! produce a `Decision`. Holds the fail-closed policy (spec §4.4).

use std::path::Path;

use crate::catalog::{Catalog, Level, Verdict};
use crate::error::CanonError;
use crate::operation::Operation;
use crate::path::canonicalize;
use crate::resolver::{resolve, Decision};

/// The facade callers use. Owns the one catalog built at startup.
pub struct Filter {
    catalog: Catalog,
}

impl Filter {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Evaluate a single raw path for `op`. Canonicalization errors never
    /// escape as an `Err` -- they become a `Deny` (spec §4.4, §7).
    pub fn check(&self, op: Operation, raw_path: &str, base_dir: Option<&Path>) -> Decision {
        match canonicalize(raw_path, base_dir) {
            Ok(canonical) => {
                let decision = resolve(&canonical, op, &self.catalog);
                tracing::debug!(
                    path = %canonical.display(),
                    op = %op,
                    verdict = ?decision.verdict,
                    level = ?decision.level,
                    "resolved"
                );
                decision
            }
            Err(e) => {
                tracing::warn!(raw_path, op = %op, error = %e, "canonicalization failed, denying");
                Decision {
                    verdict: Verdict::Deny,
                    reason: canon_error_reason(&e),
                    level: None,
                }
            }
        }
    }

    /// Evaluate a batch of raw paths independently. Returns the full
    /// per-path decision list alongside the aggregate verdict, which is a
    /// deny the moment any path denies (spec §4.4 `check_many`).
    pub fn check_many(
        &self,
        op: Operation,
        raw_paths: &[String],
        base_dir: Option<&Path>,
    ) -> BatchDecision {
        let details: Vec<PathDecision> = raw_paths
            .iter()
            .map(|p| PathDecision {
                path: p.clone(),
                decision: self.check(op, p, base_dir),
            })
            .collect();

        let verdict = if details.iter().any(|d| d.decision.is_deny()) {
            Verdict::Deny
        } else {
            Verdict::Pass
        };

        BatchDecision { verdict, details }
    }
}

#[derive(Debug, Clone)]
pub struct PathDecision {
    pub path: String,
    pub decision: Decision,
}

#[derive(Debug, Clone)]
pub struct BatchDecision {
    pub verdict: Verdict,
    pub details: Vec<PathDecision>,
}

impl BatchDecision {
    /// The first denying entry, if any -- used by adapters to report a
    /// single representative reason.
    pub fn first_deny(&self) -> Option<&PathDecision> {
        self.details.iter().find(|d| d.decision.is_deny())
    }
}

fn canon_error_reason(e: &CanonError) -> String {
    match e {
        CanonError::SymlinkLoop => "symlink loop/too deep".to_string(),
        CanonError::UnresolvableBase => "unresolvable base directory".to_string(),
        CanonError::PermissionDenied => "permission denied during resolution".to_string(),
        CanonError::Other(msg) => format!("path resolution failed: {msg}"),
    }
}

/// Format a deny decision the way spec §6 prescribes for stderr:
/// `Blocked by <pattern-or-probe>: <description>`.
pub fn format_deny_message(decision: &Decision) -> String {
    let source = match decision.level {
        Some(Level::Permissions) => "permission probe".to_string(),
        Some(level) => level.to_string(),
        None => "policy".to_string(),
    };
    format!("Blocked by {source}: {}", decision.reason)
}
