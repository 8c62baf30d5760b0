use std::fmt;
use std::str::FromStr;

/// The six tool operations the filter classifies paths for.
///
/// Read-shaped operations only observe the filesystem; mutating ones can
/// change it (or, for `Bash`, can do anything at all). Only read-shaped
/// operations honor the `TRUSTED_DIR` pseudo-level (spec §4.3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[value(rename_all = "lower")]
pub enum Operation {
    Read,
    Write,
    Edit,
    Glob,
    Grep,
    Bash,
}

impl Operation {
    /// `Read`, `Glob`, `Grep` observe without mutating.
    pub fn is_read_shaped(self) -> bool {
        matches!(self, Operation::Read | Operation::Glob | Operation::Grep)
    }

    /// `Write`, `Edit`, `Bash` can mutate (Bash can do anything).
    pub fn is_mutating(self) -> bool {
        !self.is_read_shaped()
    }

    /// Map an agent tool name (as delivered by the hook envelope, spec §4.6)
    /// to an `Operation`. Unknown tool names have no operation.
    pub fn from_tool_name(tool_name: &str) -> Option<Self> {
        match tool_name {
            "Read" => Some(Operation::Read),
            "Write" => Some(Operation::Write),
            "Edit" | "MultiEdit" | "NotebookEdit" => Some(Operation::Edit),
            "Glob" => Some(Operation::Glob),
            "Grep" => Some(Operation::Grep),
            "Bash" => Some(Operation::Bash),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Edit => "edit",
            Operation::Glob => "glob",
            Operation::Grep => "grep",
            Operation::Bash => "bash",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Operation::Read),
            "write" => Ok(Operation::Write),
            "edit" => Ok(Operation::Edit),
            "glob" => Ok(Operation::Glob),
            "grep" => Ok(Operation::Grep),
            "bash" => Ok(Operation::Bash),
            other => Err(format!("unknown operation {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_shaped_set_is_read_glob_grep() {
        assert!(Operation::Read.is_read_shaped());
        assert!(Operation::Glob.is_read_shaped());
        assert!(Operation::Grep.is_read_shaped());
        assert!(!Operation::Write.is_read_shaped());
        assert!(!Operation::Edit.is_read_shaped());
        assert!(!Operation::Bash.is_read_shaped());
    }

    #[test]
    fn mutating_is_complement_of_read_shaped() {
        for op in [
            Operation::Read,
            Operation::Write,
            Operation::Edit,
            Operation::Glob,
            Operation::Grep,
            Operation::Bash,
        ] {
            assert_eq!(op.is_mutating(), !op.is_read_shaped());
        }
    }

    #[test]
    fn tool_name_mapping() {
        assert_eq!(Operation::from_tool_name("Read"), Some(Operation::Read));
        assert_eq!(Operation::from_tool_name("Bash"), Some(Operation::Bash));
        assert_eq!(
            Operation::from_tool_name("NotebookEdit"),
            Some(Operation::Edit)
        );
        assert_eq!(Operation::from_tool_name("TaskCreate"), None);
    }

    #[test]
    fn from_str_roundtrips_display() {
        for op in [
            Operation::Read,
            Operation::Write,
            Operation::Edit,
            Operation::Glob,
            Operation::Grep,
            Operation::Bash,
        ] {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("READ".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("Bash".parse::<Operation>().unwrap(), Operation::Bash);
    }
}
