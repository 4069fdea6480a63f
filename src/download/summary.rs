use std::fmt;
use std::path::PathBuf;

use colored::Colorize;

/// Number of failed items listed before the remainder is counted.
const MAX_LISTED_FAILURES: usize = 3;

const RULE_WIDTH: usize = 60;

/// Result of a batch download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub platform: String,
    pub successful: usize,
    pub total: usize,
    pub failed: Vec<String>,
    pub destination: Option<PathBuf>,
    pub format_info: Option<String>,
    pub additional_info: Vec<(String, String)>,
}

impl DownloadSummary {
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, item: &str, exit_code: i32) {
        self.total += 1;
        if exit_code == 0 {
            self.successful += 1;
        } else {
            self.failed.push(item.to_string());
        }
    }

    #[must_use]
    pub const fn failures(&self) -> usize {
        self.total - self.successful
    }

    /// Percentage of successful downloads, `None` when nothing was processed.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successful as f64 / self.total as f64 * 100.0)
    }

    /// One line result, for example `[SoundCloud] Completed: 2/3 successful, 1 failed`.
    #[must_use]
    pub fn quick_line(&self) -> String {
        if self.total == 0 {
            format!("[{}] No items to process", self.platform)
        } else if self.successful == self.total {
            format!("[{}] All {} downloads completed successfully", self.platform, self.total)
        } else {
            format!(
                "[{}] Completed: {}/{} successful, {} failed",
                self.platform,
                self.successful,
                self.total,
                self.failures()
            )
        }
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "  {}", format!("{} DOWNLOAD SUMMARY", self.platform.to_uppercase()).bold())?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "   {} {}", "Successful downloads:".green(), self.successful)?;
        writeln!(f, "   {} {}", "Failed downloads:".red(), self.failures())?;
        writeln!(f, "   Total processed: {}", self.total)?;
        if let Some(rate) = self.success_rate() {
            writeln!(f, "   Success rate: {rate:.1}%")?;
        }
        if let Some(destination) = &self.destination {
            writeln!(f, "\nDestination: {}", destination.display())?;
        }
        if let Some(format_info) = &self.format_info {
            writeln!(f, "Format: {format_info}")?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "\nFailed items ({}):", self.failed.len())?;
            for item in self.failed.iter().take(MAX_LISTED_FAILURES) {
                writeln!(f, "   - {item}")?;
            }
            if self.failed.len() > MAX_LISTED_FAILURES {
                writeln!(f, "   ... and {} more", self.failed.len() - MAX_LISTED_FAILURES)?;
            }
        }
        if !self.additional_info.is_empty() {
            writeln!(f, "\nAdditional info:")?;
            for (key, value) in &self.additional_info {
                writeln!(f, "   {key}: {value}")?;
            }
        }
        write!(f, "{rule}")
    }
}
