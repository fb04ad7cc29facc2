//! Diagnostics collected during a generation pass.
//!
//! Every diagnostic is logged through the `log` facade as it is recorded and
//! also kept in order so callers can inspect the outcome after the pass.

use std::fmt;

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// A single message produced while parsing, validating or emitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Set when the diagnostic forbids emitting the module.
    pub aborts: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Ordered diagnostic collector for one generator invocation.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    domain: &'static str,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(domain: &'static str) -> Self {
        Diagnostics {
            domain,
            items: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into(), false);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into(), false);
    }

    /// Record a reported error. Generation continues.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message.into(), false);
    }

    /// Record a fatal-level diagnostic for a dropped entry. Generation continues.
    pub fn fatal(&mut self, message: impl Into<String>) {
        self.push(Severity::Fatal, message.into(), false);
    }

    /// Record a fatal diagnostic that prevents the module from being emitted.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.push(Severity::Fatal, message.into(), true);
    }

    fn push(&mut self, severity: Severity, message: String, aborts: bool) {
        match severity {
            Severity::Fatal | Severity::Error => log::error!("{}: {}", self.domain, message),
            Severity::Warning => log::warn!("{}: {}", self.domain, message),
            Severity::Info => log::info!("{}: {}", self.domain, message),
        }
        self.items.push(Diagnostic {
            severity,
            message,
            aborts,
        });
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn has_aborts(&self) -> bool {
        self.items.iter().any(|d| d.aborts)
    }

    /// Number of diagnostics recorded at exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    /// Whether any diagnostic at `severity` mentions `needle`.
    pub fn mentions(&self, severity: Severity, needle: &str) -> bool {
        self.items
            .iter()
            .any(|d| d.severity == severity && d.message.contains(needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Turn the collected diagnostics into a `Validation` error when any of
    /// them aborts generation.
    pub fn check(&self) -> crate::error::Result<()> {
        let mut aborting = self.items.iter().filter(|d| d.aborts);
        let Some(first) = aborting.next() else {
            return Ok(());
        };
        let rest = aborting.count();
        let summary = if rest == 0 {
            first.message.clone()
        } else {
            format!("{} (and {rest} more)", first.message)
        };
        Err(crate::error::GenError::Validation {
            domain: self.domain,
            summary,
            diagnostics: self.items.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Fatal.to_string(), "FATAL");
        assert_eq!(Severity::Warning.to_string(), "WARN");
    }

    #[test]
    fn fatal_without_reject_does_not_abort() {
        let mut diags = Diagnostics::new("power");
        diags.fatal("follow entry dropped");
        diags.warning("something");
        assert!(!diags.has_aborts());
        assert!(diags.check().is_ok());
        assert_eq!(diags.count(Severity::Fatal), 1);
    }

    #[test]
    fn reject_produces_validation_error() {
        let mut diags = Diagnostics::new("clock");
        diags.reject("duplicate signal `div_a`");
        diags.reject("duplicate signal `div_b`");
        match diags.check() {
            Err(GenError::Validation {
                domain,
                summary,
                diagnostics,
            }) => {
                assert_eq!(domain, "clock");
                assert!(summary.contains("div_a"));
                assert!(summary.contains("1 more"));
                assert_eq!(diagnostics.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn mentions_filters_by_severity() {
        let mut diags = Diagnostics::new("reset");
        diags.error("target `t0` missing active");
        assert!(diags.mentions(Severity::Error, "t0"));
        assert!(!diags.mentions(Severity::Warning, "t0"));
    }
}
