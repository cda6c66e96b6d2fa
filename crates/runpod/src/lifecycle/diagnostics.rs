//! Diagnostics returned to the host.

use std::fmt;

use serde::Serialize;

use crate::error::RunpodError;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation failed.
    Error,
    /// The operation went through but something needs attention.
    Warning,
}

/// A single message for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Whether the operation failed or only needs attention.
    pub severity: Severity,
    /// Short, fixed description of what was attempted.
    pub summary: String,
    /// Underlying error text.
    pub detail: String,
}

/// Error and warning diagnostics produced by a lifecycle operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    /// A single error diagnostic.
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self(vec![Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }])
    }

    /// Diagnostics for a failed API call.
    ///
    /// The error's display text becomes the error diagnostic. Additional
    /// GraphQL messages are reported as warnings so none are lost.
    pub fn from_error(summary: &str, err: &RunpodError) -> Self {
        let mut diags = Self::error(summary, err.to_string());
        diags.0.extend(
            err.messages()
                .into_iter()
                .skip(1)
                .map(|detail| Diagnostic {
                    severity: Severity::Warning,
                    summary: format!("{summary}: additional API error"),
                    detail,
                }),
        );
        diags
    }

    /// Append a warning.
    pub fn warn(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.0.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Whether any diagnostic is an error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// Whether there are no diagnostics at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diag in &self.0 {
            if !first {
                writeln!(f)?;
            }
            first = false;
            let label = match diag.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            write!(f, "{label}: {}: {}", diag.summary, diag.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_keeps_extra_messages_as_warnings() {
        let err = RunpodError::Protocol {
            messages: vec!["first".to_string(), "second".to_string()],
        };
        let diags = Diagnostics::from_error("Unable to read pod", &err);

        assert_eq!(diags.0.len(), 2);
        assert_eq!(diags.0[0].severity, Severity::Error);
        assert_eq!(diags.0[0].detail, "GraphQL error: first");
        assert_eq!(diags.0[1].severity, Severity::Warning);
        assert_eq!(diags.0[1].detail, "second");
        assert!(diags.has_error());
    }

    #[test]
    fn test_display_lists_every_diagnostic() {
        let mut diags = Diagnostics::error("Create failed", "boom");
        diags.warn("Stop skipped", "pod already exited");
        assert_eq!(
            diags.to_string(),
            "error: Create failed: boom\nwarning: Stop skipped: pod already exited"
        );
    }
}
