//! # Quill Shared
//!
//! Wire types of the Quill API. The crate has no server dependencies so
//! clients can reuse it.

pub mod dto;
pub mod response;

pub use response::{DataResponse, ErrorResponse, MessageResponse, PageMeta, PaginatedResponse};
