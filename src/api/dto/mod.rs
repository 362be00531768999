//! Data Transfer Objects for REST request/response serialization.
//!
//! Successful responses share the envelope `{"success": true, "data": ...}`
//! that dashboard clients expect.

pub mod ad_dto;
pub mod analytics_dto;
pub mod click_dto;

pub use ad_dto::*;
pub use analytics_dto::*;
pub use click_dto::*;
