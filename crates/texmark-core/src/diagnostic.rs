use std::collections::BTreeSet;

pub const W_UNDEFINED_LABEL: &str = "W_UNDEFINED_LABEL";
pub const W_DUPLICATE_LABEL: &str = "W_DUPLICATE_LABEL";
pub const W_UNPROCESSED_COMMAND: &str = "W_UNPROCESSED_COMMAND";
pub const W_DEFAULTED_ENVIRONMENT: &str = "W_DEFAULTED_ENVIRONMENT";
/// A run that stopped on a fatal error.
pub const E_CONVERSION: &str = "E_CONVERSION";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Advisory findings collected over a whole batch.
///
/// Sets are ordered so the end-of-run summary is stable between runs.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    undefined_labels: BTreeSet<String>,
    duplicate_labels: BTreeSet<String>,
    unprocessed_commands: BTreeSet<String>,
    defaulted_environments: BTreeSet<String>,
}

impl Diagnostics {
    pub fn undefined_label(&mut self, key: &str) {
        self.undefined_labels.insert(key.to_string());
    }

    pub fn duplicate_label(&mut self, key: &str) {
        self.duplicate_labels.insert(key.to_string());
    }

    pub fn unprocessed_command(&mut self, name: &str) {
        self.unprocessed_commands.insert(name.to_string());
    }

    pub fn defaulted_environment(&mut self, name: &str) {
        self.defaulted_environments.insert(name.to_string());
    }

    pub fn undefined_labels(&self) -> &BTreeSet<String> {
        &self.undefined_labels
    }

    pub fn duplicate_labels(&self) -> &BTreeSet<String> {
        &self.duplicate_labels
    }

    pub fn unprocessed_commands(&self) -> &BTreeSet<String> {
        &self.unprocessed_commands
    }

    pub fn defaulted_environments(&self) -> &BTreeSet<String> {
        &self.defaulted_environments
    }

    pub fn is_empty(&self) -> bool {
        self.undefined_labels.is_empty()
            && self.duplicate_labels.is_empty()
            && self.unprocessed_commands.is_empty()
            && self.defaulted_environments.is_empty()
    }

    /// One diagnostic per non-empty category.
    pub fn summary(&self) -> Vec<Diagnostic> {
        let groups = [
            (W_UNDEFINED_LABEL, "undefined labels", &self.undefined_labels),
            (W_DUPLICATE_LABEL, "duplicate labels", &self.duplicate_labels),
            (
                W_UNPROCESSED_COMMAND,
                "unprocessed commands",
                &self.unprocessed_commands,
            ),
            (
                W_DEFAULTED_ENVIRONMENT,
                "defaulted environments",
                &self.defaulted_environments,
            ),
        ];
        groups
            .into_iter()
            .filter(|(_, _, names)| !names.is_empty())
            .map(|(code, what, names)| {
                let list: Vec<&str> = names.iter().map(String::as_str).collect();
                Diagnostic::warning(code, format!("{}: {}", what, list.join(", ")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostics, W_UNDEFINED_LABEL, W_UNPROCESSED_COMMAND};

    #[test]
    fn summary_is_sorted_and_skips_empty_groups() {
        let mut diagnostics = Diagnostics::default();
        assert!(diagnostics.is_empty());
        diagnostics.unprocessed_command("zeta");
        diagnostics.unprocessed_command("alpha");
        diagnostics.unprocessed_command("alpha");
        diagnostics.undefined_label("thm:x");

        let summary = diagnostics.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].code, W_UNDEFINED_LABEL);
        assert_eq!(summary[1].code, W_UNPROCESSED_COMMAND);
        assert_eq!(summary[1].message, "unprocessed commands: alpha, zeta");
    }
}
