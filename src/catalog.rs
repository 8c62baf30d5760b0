//! C2: the pattern catalog. A static, ordered list of
//! `(regex, level, decision, description, applicable-ops)` entries plus
//! the permission probe (spec §3, §4.2).

use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{PathGateError, Result};
use crate::operation::Operation;

/// The specificity lattice (spec §3), most to least specific.
/// `TrustedDir` is a pseudo-level handled outside the lattice by the
/// resolver (spec §4.3) and is ordered last here only for `Debug`/`Ord`
/// convenience; it never participates in the level comparison the
/// resolver performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    FileName,
    FileExtension,
    Directory,
    SecurityDirectory,
    Permissions,
    DirGlob,
    GlobMiddle,
    TrustedDir,
}

impl Level {
    /// Whether this level takes part in the strict specificity ordering.
    /// `TrustedDir` is the one pseudo-level that does not.
    pub fn is_lattice_level(self) -> bool {
        self != Level::TrustedDir
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::FileName => "FILE_NAME",
            Level::FileExtension => "FILE_EXTENSION",
            Level::Directory => "DIRECTORY",
            Level::SecurityDirectory => "SECURITY_DIRECTORY",
            Level::Permissions => "PERMISSIONS",
            Level::DirGlob => "DIR_GLOB",
            Level::GlobMiddle => "GLOB_MIDDLE",
            Level::TrustedDir => "TRUSTED_DIR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Deny,
}

/// A single catalog entry. `applicable_ops` of `None` means "all ops".
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub regex: Regex,
    pub level: Level,
    pub verdict: Verdict,
    pub description: String,
    pub applicable_ops: Option<Vec<Operation>>,
}

impl PatternEntry {
    pub fn applies_to(&self, op: Operation) -> bool {
        match &self.applicable_ops {
            None => true,
            Some(ops) => ops.contains(&op),
        }
    }
}

/// Raw, serializable form of a supplemental catalog entry (spec §6,
/// §10.3 of SPEC_FULL.md): `{regex, level, verdict, description, ops?}`.
#[derive(Debug, Deserialize)]
struct RawEntry {
    regex: String,
    level: Level,
    verdict: Verdict,
    description: String,
    #[serde(default)]
    ops: Option<Vec<String>>,
}

/// The immutable, versioned pattern catalog. Construction is the only
/// place regexes are compiled; lookups never fail.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub version: u32,
    entries: Vec<PatternEntry>,
}

/// Bumped whenever the built-in baseline catalog changes shape.
pub const CATALOG_VERSION: u32 = 1;

/// Extensions treated as source code for the credential/password
/// substring carve-out (spec §4.2, SPEC_FULL §11.4). Deliberately excludes
/// prose extensions like `.md`: a file named `password_reset.md` is exactly
/// the false positive the carve-out is *not* meant to rescue (spec §8 S7).
pub const CODE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "h", "hpp", "rs", "go", "ts", "tsx", "js", "jsx", "py", "java", "rb",
];

impl Catalog {
    /// Build the catalog from the compiled-in baseline, optionally
    /// merging a supplemental JSON file named by `PATHGATE_CATALOG`
    /// (additive only -- spec §9 Open Question, SPEC_FULL §10.3).
    pub fn build() -> Result<Self> {
        let mut entries = baseline_entries()?;

        if let Ok(path) = std::env::var("PATHGATE_CATALOG") {
            let supplemental = load_supplemental(Path::new(&path))?;
            entries.extend(supplemental);
        }

        check_no_duplicates(&entries)?;

        Ok(Self {
            version: CATALOG_VERSION,
            entries,
        })
    }

    /// Entries whose regex matches `path` and whose `applicable_ops`
    /// includes `op`.
    pub fn matches<'a>(&'a self, path: &str, op: Operation) -> Vec<&'a PatternEntry> {
        self.entries
            .iter()
            .filter(|e| e.applies_to(op) && e.regex.is_match(path))
            .collect()
    }
}

fn check_no_duplicates(entries: &[PatternEntry]) -> Result<()> {
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if a.level == b.level && a.regex.as_str() == b.regex.as_str() {
                return Err(PathGateError::DuplicateEntry {
                    regex: a.regex.as_str().to_string(),
                    level: a.level.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn compile(
    pattern: &str,
    level: Level,
    verdict: Verdict,
    description: &str,
    ops: Option<&[Operation]>,
) -> Result<PatternEntry> {
    let regex = Regex::new(pattern).map_err(|e| PathGateError::BadPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PatternEntry {
        regex,
        level,
        verdict,
        description: description.to_string(),
        applicable_ops: ops.map(|o| o.to_vec()),
    })
}

/// The read-shaped operations, used for `TRUSTED_DIR` entries (spec §4.2).
const READ_SHAPED: &[Operation] = &[Operation::Read, Operation::Glob, Operation::Grep];

fn baseline_entries() -> Result<Vec<PatternEntry>> {
    // `credential`/`password` below only deny when the path does not look
    // like source code (spec §4.2). The `regex` crate has no lookahead,
    // so that carve-out is applied in the resolver via `CODE_EXTENSIONS`
    // rather than baked into these patterns.
    let mut entries = vec![
        compile(
            r"(^|/)id_(rsa|dsa|ecdsa|ed25519|ecdsa_sk|ed25519_sk)$",
            Level::FileName,
            Verdict::Deny,
            "private SSH key file name",
            None,
        )?,
        compile(
            r"(^|/)\.netrc$",
            Level::FileName,
            Verdict::Deny,
            "netrc credential file",
            None,
        )?,
        compile(
            r"\.env$",
            Level::FileExtension,
            Verdict::Deny,
            "dotenv file",
            None,
        )?,
        compile(
            r"\.env\.[^/]+$",
            Level::FileExtension,
            Verdict::Deny,
            "dotenv variant file",
            None,
        )?,
        compile(
            r"\.pub$",
            Level::FileExtension,
            Verdict::Pass,
            "public key file",
            None,
        )?,
        compile(
            r"\.pem$",
            Level::FileExtension,
            Verdict::Pass,
            "PEM-encoded public artifact",
            None,
        )?,
        compile(
            r"/\.?secrets?/",
            Level::SecurityDirectory,
            Verdict::Deny,
            "secrets directory",
            None,
        )?,
        compile(
            "credential",
            Level::SecurityDirectory,
            Verdict::Deny,
            "path contains 'credential'",
            None,
        )?,
        compile(
            "password",
            Level::SecurityDirectory,
            Verdict::Deny,
            "path contains 'password'",
            None,
        )?,
        compile(
            r"^~/\.ssh/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.ssh/ directory",
            None,
        )?,
        compile(
            r"^~/\.gnupg/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.gnupg/ directory",
            None,
        )?,
        compile(
            r"^~/\.aws/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.aws/ directory",
            None,
        )?,
        compile(
            r"^~/\.config/gcloud/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.config/gcloud/ directory",
            None,
        )?,
        compile(
            r"^~/\.azure/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.azure/ directory",
            None,
        )?,
        compile(
            r"^~/\.config/sops/",
            Level::DirGlob,
            Verdict::Deny,
            "~/.config/sops/ directory",
            None,
        )?,
        compile(
            r"^~/dotfiles/",
            Level::TrustedDir,
            Verdict::Pass,
            "trusted dotfiles directory",
            Some(READ_SHAPED),
        )?,
        compile(
            r"^~/codebases/",
            Level::TrustedDir,
            Verdict::Pass,
            "trusted codebases directory",
            Some(READ_SHAPED),
        )?,
    ];

    entries.sort_by_key(|e| e.level);
    Ok(entries)
}

fn load_supplemental(path: &Path) -> Result<Vec<PatternEntry>> {
    let contents = fs::read_to_string(path).map_err(|e| PathGateError::CatalogFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let raw: Vec<RawEntry> =
        serde_json::from_str(&contents).map_err(|e| PathGateError::CatalogFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    raw.into_iter()
        .map(|r| {
            let ops = r
                .ops
                .map(|names| {
                    names
                        .iter()
                        .map(|n| n.parse::<Operation>())
                        .collect::<std::result::Result<Vec<_>, _>>()
                        .map_err(|reason| PathGateError::CatalogFile {
                            path: path.to_path_buf(),
                            reason,
                        })
                })
                .transpose()?;
            compile(
                &r.regex,
                r.level,
                r.verdict,
                &r.description,
                ops.as_deref(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error() {
        let catalog = Catalog::build().unwrap();
        assert_eq!(catalog.version, CATALOG_VERSION);
        assert!(!catalog.entries.is_empty());
    }

    #[test]
    fn id_ed25519_matches_file_name_deny() {
        let catalog = Catalog::build().unwrap();
        let hits = catalog.matches("/home/u/.ssh/id_ed25519", Operation::Read);
        assert!(hits
            .iter()
            .any(|e| e.level == Level::FileName && e.verdict == Verdict::Deny));
    }

    #[test]
    fn pub_file_matches_file_extension_pass() {
        let catalog = Catalog::build().unwrap();
        let hits = catalog.matches("/home/u/.ssh/authorized_keys.pub", Operation::Read);
        assert!(hits
            .iter()
            .any(|e| e.level == Level::FileExtension && e.verdict == Verdict::Pass));
    }

    #[test]
    fn trusted_dir_only_applies_to_read_shaped_ops() {
        let catalog = Catalog::build().unwrap();
        let write_hits = catalog.matches("~/dotfiles/config/x", Operation::Write);
        assert!(write_hits.iter().all(|e| e.level != Level::TrustedDir));
        let read_hits = catalog.matches("~/dotfiles/config/x", Operation::Read);
        assert!(read_hits.iter().any(|e| e.level == Level::TrustedDir));
    }

    #[test]
    fn no_duplicate_regex_level_pairs_in_baseline() {
        let entries = baseline_entries().unwrap();
        check_no_duplicates(&entries).unwrap();
    }
}
