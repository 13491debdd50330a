use serde::{Deserialize, Serialize};

/// Dials controlling how predicate results turn into a match list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Treat a restriction the profile cannot answer as passed.
    pub unknown_is_eligible: bool,
    /// Keep listings whose deadline has already passed.
    pub include_closed: bool,
    /// Listings returned to callers without a profile.
    pub anonymous_limit: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            unknown_is_eligible: false,
            include_closed: false,
            anonymous_limit: 20,
        }
    }
}
