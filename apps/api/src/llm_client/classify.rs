//! Failure classification for DashScope error responses.
//!
//! DashScope reports billing problems as free text, so quota detection is a
//! case-sensitive substring match. Everything that decides "quota or not" lives
//! here so the keyword match can be swapped for a structured check later.

/// Substrings of a provider error message that indicate exhausted quota or balance.
const QUOTA_KEYWORDS: &[&str] = &["quota", "余额", "exceeded", "balance"];

/// Provider error codes that indicate an account in arrears.
const QUOTA_CODES: &[&str] = &["Arrearage"];

/// Rate-limit codes. Checked before the keywords since their messages say "exceeded".
/// `Throttling.AllocationQuota` (free allowance used up) stays with the keyword match.
const THROTTLING_CODES: &[&str] = &["Throttling", "Throttling.RateQuota"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Billing allowance exhausted; the user has to top up or raise limits.
    Quota,
    /// Anything else the provider rejected.
    Other,
}

/// Classifies a failed upstream call from its error code (if any) and message.
pub fn classify_failure(code: Option<&str>, message: &str) -> FailureKind {
    if code.is_some_and(|c| QUOTA_CODES.contains(&c)) {
        return FailureKind::Quota;
    }
    if code.is_some_and(|c| THROTTLING_CODES.contains(&c)) {
        return FailureKind::Other;
    }
    if QUOTA_KEYWORDS.iter().any(|k| message.contains(k)) {
        FailureKind::Quota
    } else {
        FailureKind::Other
    }
}
