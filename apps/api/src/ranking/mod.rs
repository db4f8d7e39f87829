// Ranking: verdict validation, reconciliation of classifier output into a
// complete epoch, and the HTTP surface over the current epoch.

pub mod handlers;
pub mod reconciler;
pub mod verdict;

/// Longest accepted criteria string, in characters.
pub const MAX_CRITERIA_LEN: usize = 500;
