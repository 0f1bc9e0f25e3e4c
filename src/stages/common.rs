use std::fmt;

/// One item a stage could not process, keyed by the article's external id
/// (or its row id when the article itself could not be loaded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure {
    pub key: String,
    pub reason: String,
}

/// Per-run tally shared by the stage drivers.
///
/// Failures are isolated per item; warnings never count against success.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageReport {
    pub stage: &'static str,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
    pub warnings: Vec<String>,
}

impl StageReport {
    pub fn new(stage: &'static str, total: usize) -> Self {
        StageReport {
            stage,
            total,
            ..StageReport::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, key: impl Into<String>, reason: impl fmt::Display) {
        self.failures.push(ItemFailure {
            key: key.into(),
            reason: reason.to_string(),
        });
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when no item failed. An empty run is a success.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{} succeeded", self.stage, self.succeeded, self.total)?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if !self.warnings.is_empty() {
            write!(f, ", {} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_tally() {
        let mut report = StageReport::new("summarize", 3);
        report.record_success();
        report.record_success();
        report.record_failure("42", "model timed out");
        report.record_warning("PMID=7 score 0.5 above 0.3");

        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failures[0].key, "42");
        assert_eq!(
            report.to_string(),
            "summarize: 2/3 succeeded, 1 failed, 1 warning(s)"
        );
    }

    #[test]
    fn test_empty_run_is_success() {
        let report = StageReport::new("validate", 0);
        assert!(report.is_success());
        assert_eq!(report.to_string(), "validate: 0/0 succeeded");
    }
}
