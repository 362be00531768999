//! Advertisement identity and definition.
//!
//! [`AdId`] is a newtype over the integer primary key of the `ads` table so
//! that ad identifiers cannot be confused with click event ids.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a video advertisement.
///
/// Assigned by the store when the ad is provisioned and immutable thereafter.
/// Click events reference ads by this id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdId(i32);

impl AdId {
    /// Wraps a raw integer id.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw integer id.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for AdId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<AdId> for i32 {
    fn from(id: AdId) -> Self {
        id.0
    }
}

/// A video advertisement definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    /// Store-assigned identifier.
    pub id: AdId,
    /// URL of the ad creative.
    pub image_url: String,
    /// URL the ad links to.
    pub target_url: String,
    /// Short display title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to provision a new ad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAd {
    /// URL of the ad creative.
    pub image_url: String,
    /// URL the ad links to.
    pub target_url: String,
    /// Short display title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
}

impl NewAd {
    /// The two demo ads inserted into an empty store at startup.
    #[must_use]
    pub fn samples() -> Vec<Self> {
        (1..=2)
            .map(|n| Self {
                image_url: format!("https://example.com/ad{n}.jpg"),
                target_url: format!("https://example.com/product{n}"),
                title: format!("Product {n}"),
                description: Some("Product description".to_string()),
            })
            .collect()
    }
}
