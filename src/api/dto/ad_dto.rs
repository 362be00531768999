//! Ad catalog DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::AdRecord;

/// An ad definition as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdDto {
    /// Ad id.
    pub id: i32,
    /// Creative URL.
    pub image_url: String,
    /// Landing page URL.
    pub target_url: String,
    /// Display title.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<AdRecord> for AdDto {
    fn from(ad: AdRecord) -> Self {
        Self {
            id: ad.id.get(),
            image_url: ad.image_url,
            target_url: ad.target_url,
            title: ad.title,
            description: ad.description,
            created_at: ad.created_at,
            updated_at: ad.updated_at,
        }
    }
}

/// Response body for `GET /ads`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdListResponse {
    /// Always `true`.
    pub success: bool,
    /// Ads, newest first.
    pub data: Vec<AdDto>,
}

/// Response body for `GET /ads/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdResponse {
    /// Always `true`.
    pub success: bool,
    /// The ad.
    pub data: AdDto,
}
