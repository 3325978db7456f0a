//! Expiry status stored alongside every product and sale snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status derived from the number of days left before a product expires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    /// More than the critical window left, or no expiry date at all
    #[sea_orm(string_value = "safe")]
    Safe,
    /// Expires within the critical window (today included)
    #[sea_orm(string_value = "critical")]
    Critical,
    /// Expiry date is in the past
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl ExpiryStatus {
    /// Lowercase identifier, as used by filters and the JSON backup format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Critical => "critical",
            Self::Expired => "expired",
        }
    }

    /// Upper-case label printed in report tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Critical => "CRITICAL",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
