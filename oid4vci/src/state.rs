//! State lifetimes for the artifacts persisted between issuance steps.

use chrono::TimeDelta;

/// The duration for which each issuance artifact is valid.
pub enum Expire {
    /// A pre-authorized code from the offer endpoint.
    PreAuthorizedCode,

    /// An authorization code from the OAuth redirect flow.
    AuthorizationCode,

    /// A `c_nonce` issued with a token or rotated after issuance.
    CNonce,

    /// An access token.
    Access,

    /// An issued credential.
    Credential,
}

impl Expire {
    /// Duration of the artifact.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        match self {
            Self::PreAuthorizedCode => TimeDelta::try_minutes(10).unwrap_or_default(),
            Self::AuthorizationCode | Self::CNonce => {
                TimeDelta::try_minutes(5).unwrap_or_default()
            }
            Self::Access => TimeDelta::try_hours(1).unwrap_or_default(),
            Self::Credential => TimeDelta::try_days(365).unwrap_or_default(),
        }
    }
}
