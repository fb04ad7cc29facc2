//! Outcome of one generator invocation.

use serde::Serialize;

use crate::celllib::CellFileOutcome;
use crate::diag::{Diagnostic, Severity};

/// Summary of a successful generation pass.
///
/// Success is signalled by the `Ok` result carrying this report; the
/// diagnostics may still contain reported errors for skipped entries.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub domain: &'static str,
    pub module_name: String,
    pub diagnostics: Vec<Diagnostic>,
    /// `None` when no cell directory was configured.
    pub cell_file: Option<CellFileOutcome>,
}

impl GenerationReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Whether anything at error level or above was reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity <= Severity::Error)
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} `{}`: {} fatal, {} error(s), {} warning(s)",
            self.domain,
            self.module_name,
            self.count(Severity::Fatal),
            self.count(Severity::Error),
            self.count(Severity::Warning)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_by_severity() {
        let report = GenerationReport {
            domain: "reset",
            module_name: "rstctrl".into(),
            diagnostics: vec![
                Diagnostic {
                    severity: Severity::Warning,
                    message: "w".into(),
                    aborts: false,
                },
                Diagnostic {
                    severity: Severity::Error,
                    message: "e".into(),
                    aborts: false,
                },
            ],
            cell_file: None,
        };
        assert!(report.has_errors());
        assert_eq!(
            report.summary(),
            "reset `rstctrl`: 0 fatal, 1 error(s), 1 warning(s)"
        );
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let report = GenerationReport {
            domain: "power",
            module_name: "pwr".into(),
            diagnostics: vec![Diagnostic {
                severity: Severity::Warning,
                message: "w".into(),
                aborts: false,
            }],
            cell_file: Some(CellFileOutcome::UpToDate),
        };
        assert!(!report.has_errors());
    }
}
