//! Probe mode reporting
//!
//! Probe mode fetches every registered target exactly once, writes nothing,
//! and reports what each endpoint answered.

use crate::poller::FetchOutcome;
use crate::site::SiteAdapter;
use crate::state::Target;
use std::fmt;
use url::Url;

/// What one target answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Operator-facing label such as `/g/` or `/g/589254`
    pub label: String,
    pub uri: Url,
    /// Outcome kind, e.g. `success` or `not-found`
    pub outcome: &'static str,
    /// Extra detail: item count on success, reason on failure
    pub detail: Option<String>,
    /// Validator the server issued
    pub token: Option<String>,
}

impl ProbeReport {
    /// Summarises an outcome for a target
    ///
    /// Successful board fetches count listed threads, thread fetches count
    /// posts.
    pub fn new(target: &Target, outcome: &FetchOutcome, site: &dyn SiteAdapter) -> Self {
        let (detail, token) = match outcome {
            FetchOutcome::Success { content, token } => {
                let detail = if target.is_thread() {
                    format!("{} post(s)", site.extract_posts(content).len())
                } else {
                    format!("{} thread(s)", site.extract_threads(content).len())
                };
                (Some(detail), token.as_ref().map(|t| t.value().to_string()))
            }
            FetchOutcome::TransientError { code, reason } => {
                let detail = match code {
                    Some(code) => format!("HTTP {}: {}", code, reason),
                    None => reason.clone(),
                };
                (Some(detail), None)
            }
            _ => (None, None),
        };

        Self {
            label: target.label(),
            uri: target.uri.clone(),
            outcome: outcome.kind(),
            detail,
            token,
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.label, self.uri, self.outcome)?;
        if let Some(detail) = &self.detail {
            write!(f, ", {}", detail)?;
        }
        if let Some(token) = &self.token {
            write!(f, " [{}]", token)?;
        }
        Ok(())
    }
}

/// Prints probe results to stdout
pub fn print_probe_reports(reports: &[ProbeReport]) {
    println!("=== Probe Results ===\n");
    for report in reports {
        println!("  {}", report);
    }
    println!();
}
