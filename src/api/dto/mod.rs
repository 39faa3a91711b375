//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain enums cross this boundary as their snake_case string forms;
//! the DTOs mirror domain structures so the OpenAPI schema stays
//! self-contained.

pub mod activity_dto;
pub mod comment_dto;
pub mod common_dto;
pub mod participation_dto;

pub use activity_dto::*;
pub use comment_dto::*;
pub use common_dto::*;
pub use participation_dto::*;
