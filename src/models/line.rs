//! Line status data structures.

/// The distinguished "nothing is wrong" status; transitions into it are
/// remembered but never announced.
pub const GOOD_SERVICE: &str = "Good Service";

/// One transport line's current condition, flattened from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStatus {
    /// Line name, unique within one snapshot (e.g., "Central")
    pub name: String,

    /// Free-text severity description (e.g., "Good Service", "Severe Delays")
    pub status: String,

    /// Free-text explanation of the disruption, if the feed supplies one
    pub reason: Option<String>,

    /// Link to further information; surfaced in logs, never in posts
    pub info_url: Option<String>,

    /// Additional disruption descriptions, in feed order
    pub disruptions: Vec<String>,
}

impl LineStatus {
    /// Whether this line currently reports the no-issue status.
    pub fn is_good_service(&self) -> bool {
        self.status == GOOD_SERVICE
    }
}

/// A detected, notification-worthy transition for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Status the line held before this snapshot, if it was known
    pub previous: Option<String>,

    /// The line as observed in the current snapshot
    pub line: LineStatus,
}
