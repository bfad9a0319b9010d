//! # Quill Core
//!
//! The domain layer of the Quill blog backend.
//! This crate contains the post lifecycle rules and the ports infrastructure
//! implements, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, FieldErrors, RepoError};
pub use services::{PostService, PostServiceConfig};
