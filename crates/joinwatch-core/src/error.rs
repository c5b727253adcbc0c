use joinwatch_types::{RegionId, RegionStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown region: {0}")]
    UnknownRegion(RegionId),

    #[error("Region {id} cannot {action} while {from}")]
    InvalidTransition {
        id: RegionId,
        from: RegionStatus,
        action: &'static str,
    },

    #[error("Correction '{from}' rejected: {reason}")]
    Correction { from: String, reason: &'static str },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
