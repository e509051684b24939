//! State lifetimes for the artifacts persisted between verification steps.

use chrono::TimeDelta;

/// The duration for which each verification artifact is valid.
pub enum Expire {
    /// A challenge backing a same-device (DCQL) presentation.
    Challenge,

    /// A challenge backing a SIOPv2 cross-device presentation.
    SiopChallenge,

    /// A signed request object.
    Request,
}

impl Expire {
    /// Duration of the artifact.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        match self {
            Self::Challenge | Self::Request => TimeDelta::try_minutes(5).unwrap_or_default(),
            Self::SiopChallenge => TimeDelta::try_minutes(10).unwrap_or_default(),
        }
    }
}
