use serde::{Deserialize, Serialize};

/// Outcome of one bulk import run.
///
/// `messages` keeps every error and diagnostic in the order they occurred;
/// interactive views show only the first few via [`ImportReport::visible_messages`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub messages: Vec<String>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report for a batch that could not be processed at all.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            error_count: 1,
            messages: vec![message.into()],
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.messages.push(message.into());
    }

    /// Non-fatal diagnostic, not counted as an error.
    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warning_count += 1;
        self.messages.push(message.into());
    }

    pub fn visible_messages(&self, limit: usize) -> &[String] {
        &self.messages[..self.messages.len().min(limit)]
    }

    pub fn hidden_message_count(&self, limit: usize) -> usize {
        self.messages.len().saturating_sub(limit)
    }

    /// The (successCount, errorCount, messages) triple handed to callers.
    pub fn into_parts(self) -> (usize, usize, Vec<String>) {
        (self.success_count, self.error_count, self.messages)
    }

    /// Human-readable summary for the invoking moderator.
    pub fn summary(&self, limit: usize) -> String {
        let mut lines = vec![format!(
            "Zaimportowano: {}, błędy: {}, ostrzeżenia: {}",
            self.success_count, self.error_count, self.warning_count
        )];
        lines.extend(self.visible_messages(limit).iter().map(|m| format!("- {}", m)));
        let hidden = self.hidden_message_count(limit);
        if hidden > 0 {
            lines.push(format!("... oraz {} kolejnych komunikatów", hidden));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_message_order() {
        let mut report = ImportReport::new();
        report.record_success();
        report.record_warning("w1");
        report.record_error("e1");

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.messages, vec!["w1", "e1"]);
    }

    #[test]
    fn test_summary_truncates_but_report_keeps_everything() {
        let mut report = ImportReport::new();
        for i in 0..12 {
            report.record_error(format!("błąd {}", i));
        }

        assert_eq!(report.visible_messages(10).len(), 10);
        assert_eq!(report.hidden_message_count(10), 2);
        let summary = report.summary(10);
        assert!(summary.contains("błąd 9"));
        assert!(!summary.contains("błąd 10"));
        assert!(summary.contains("2 kolejnych"));
        assert_eq!(report.messages.len(), 12);
    }

    #[test]
    fn test_fatal_report() {
        let (ok, errors, messages) = ImportReport::fatal("Nie znaleziono pliku").into_parts();
        assert_eq!((ok, errors), (0, 1));
        assert_eq!(messages, vec!["Nie znaleziono pliku"]);
    }
}
