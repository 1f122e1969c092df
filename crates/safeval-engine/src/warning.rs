//! Non-fatal findings attached to calculator results
//!
//! Codes are grouped by producer:
//! - `W01xx` diagnostic coverage
//! - `W02xx` PFHd aggregation
//! - `W03xx` common cause failure scoring
//! - `W04xx` category advice
//! - `W05xx` PL↔SIL consistency
//! - `W06xx` Performance Level determination
//! - `W07xx` risk and checklist evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A warning produced while computing a best-effort value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable warning code (e.g., "W0101")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Entity the warning refers to (device id, subsystem id, ...)
    pub subject: Option<String>,
}

impl Warning {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        let warning = Self {
            code: code.to_string(),
            message: message.into(),
            subject: None,
        };
        tracing::warn!(code = %warning.code, "{}", warning.message);
        warning
    }

    /// Attach the entity the warning refers to
    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}]: {}", self.code, self.message)?;
        if let Some(ref subject) = self.subject {
            write!(f, "\n  --> {}", subject)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_subject() {
        let warning = Warning::new("W0101", "DCavg out of range").about("dev-1");
        let text = warning.to_string();
        assert!(text.starts_with("warning[W0101]: DCavg out of range"));
        assert!(text.contains("--> dev-1"));
    }

    #[test]
    fn test_code_match_and_plain_display() {
        let warning = Warning::new("W0201", "missing PFHd");
        assert!(warning.is("W0201"));
        assert!(!warning.is("W0101"));
        assert_eq!(warning.to_string(), "warning[W0201]: missing PFHd");
    }
}
