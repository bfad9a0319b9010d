//! Application services composing the domain rules with the ports.

mod posts;

pub use posts::{IMAGE_DIRECTORY, PostService, PostServiceConfig};
