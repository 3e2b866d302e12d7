//! Record of silently recovered conditions during one acquisition.
//!
//! Failed candidates and dropped duplicates never change control flow; they
//! are collected here so a caller (or `--debug` output) can see them.

/// A candidate URL that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// The candidate URL.
    pub url: String,
    /// Why the fetch failed.
    pub reason: String,
}

/// Everything that was skipped or dropped during an acquisition run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Candidates whose fetch failed (network, timeout, error status).
    pub failed: Vec<CandidateFailure>,
    /// Candidates that answered, but not with an iCalendar payload.
    pub rejected: Vec<String>,
    /// UIDs dropped while merging because an earlier event had them.
    pub duplicate_uids: Vec<String>,
}

impl Diagnostics {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed candidate fetch.
    pub fn record_failure(&mut self, url: impl Into<String>, reason: impl ToString) {
        self.failed.push(CandidateFailure {
            url: url.into(),
            reason: reason.to_string(),
        });
    }

    /// Records a candidate that did not serve a calendar.
    pub fn record_rejected(&mut self, url: impl Into<String>) {
        self.rejected.push(url.into());
    }

    /// Appends everything recorded in `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.failed.extend(other.failed);
        self.rejected.extend(other.rejected);
        self.duplicate_uids.extend(other.duplicate_uids);
    }

    /// Returns true if nothing was skipped or dropped.
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty() && self.duplicate_uids.is_empty()
    }
}
