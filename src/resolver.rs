//! C3: the resolver. Selects the winning catalog entry among all matches
//! using the specificity lattice and the DENY-wins tie-break (spec §4.3).

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::catalog::{Catalog, Level, Verdict, CODE_EXTENSIONS};
use crate::operation::Operation;

/// The outcome of evaluating one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: String,
    pub level: Option<Level>,
}

impl Decision {
    pub fn is_deny(&self) -> bool {
        self.verdict == Verdict::Deny
    }
}

/// A matched catalog entry, reduced to what the resolver needs once
/// matching is done. Owned so the synthetic `PERMISSIONS` probe hit can
/// sit alongside real catalog entries without a shared lifetime.
struct Hit {
    level: Level,
    verdict: Verdict,
    description: String,
}

/// Evaluate a single canonical path against the catalog for `op`.
///
/// `path` is the canonical path, matched against the catalog in both its
/// absolute form and, when it falls under the caller's home directory, a
/// re-tilded form (`~/...`) so that `DirGlob`/`TrustedDir` entries -- which
/// are written against `~/...` -- still match (spec §4.2).
pub fn resolve(path: &Path, op: Operation, catalog: &Catalog) -> Decision {
    let absolute = path.to_string_lossy().to_string();
    let tilded = retilde(path);

    let mut matched = catalog.matches(&absolute, op);
    if let Some(t) = &tilded {
        if t != &absolute {
            matched.extend(catalog.matches(t, op));
        }
    }

    let mut hits: Vec<Hit> = matched
        .into_iter()
        // The credential/password substring rule is carved out for paths
        // that look like source code (spec §4.2).
        .filter(|e| {
            if e.level == Level::SecurityDirectory
                && e.verdict == Verdict::Deny
                && matches!(e.regex.as_str(), "credential" | "password")
            {
                !looks_like_code(path)
            } else {
                true
            }
        })
        .map(|e| Hit {
            level: e.level,
            verdict: e.verdict,
            description: e.description.clone(),
        })
        .collect();

    if let Some(reason) = permission_probe(path) {
        hits.push(Hit {
            level: Level::Permissions,
            verdict: Verdict::Deny,
            description: reason,
        });
    }

    let lattice_hits: Vec<&Hit> = hits.iter().filter(|h| h.level.is_lattice_level()).collect();

    if lattice_hits.is_empty() {
        // No lattice-level match. TRUSTED_DIR can still pass a read-shaped op.
        if op.is_read_shaped() {
            if let Some(trusted) = hits.iter().find(|h| h.level == Level::TrustedDir) {
                return Decision {
                    verdict: Verdict::Pass,
                    reason: trusted.description.clone(),
                    level: Some(Level::TrustedDir),
                };
            }
        }
        return Decision {
            verdict: Verdict::Pass,
            reason: "no matching pattern".to_string(),
            level: None,
        };
    }

    let winning_level = lattice_hits.iter().map(|h| h.level).min().unwrap();
    let at_level: Vec<&&Hit> = lattice_hits
        .iter()
        .filter(|h| h.level == winning_level)
        .collect();

    if let Some(deny) = at_level.iter().find(|h| h.verdict == Verdict::Deny) {
        return Decision {
            verdict: Verdict::Deny,
            reason: deny.description.clone(),
            level: Some(winning_level),
        };
    }

    // Everything at the winning level passes. TRUSTED_DIR only has a say
    // when no rule at FILE_NAME, FILE_EXTENSION, DIRECTORY, or
    // SECURITY_DIRECTORY matched (spec §4.3 step 5); since those are
    // exactly the levels more specific than TRUSTED_DIR, and we already
    // found a lattice match, TRUSTED_DIR plays no further role here.
    Decision {
        verdict: Verdict::Pass,
        reason: at_level[0].description.clone(),
        level: Some(winning_level),
    }
}

/// `Level::Permissions` is populated by a probe, not a regex: if the path
/// exists and the "others read" bit is cleared, a synthetic deny entry is
/// injected (spec §4.3 step 6). Returns the deny reason on a hit.
fn permission_probe(path: &Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    let mode = meta.permissions().mode();
    if mode & 0o004 == 0 {
        Some(format!("restrictive file permissions (mode 0o{:o})", mode & 0o777))
    } else {
        None
    }
}

fn looks_like_code(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => CODE_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn retilde(path: &Path) -> Option<String> {
    let home = std::env::var("HOME").ok()?;
    let path_str = path.to_string_lossy();
    path_str
        .strip_prefix(&home)
        .map(|rest| format!("~{rest}"))
}
