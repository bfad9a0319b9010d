//! Domain entities and the pure rules of the post lifecycle.

mod engagement;
mod input;
mod post;
mod query;
mod taxonomy;

pub mod reading_time;
pub mod schedule;
pub mod slug;

pub use engagement::{EngagementCounts, LikeOutcome, Touch};
pub use input::{
    ImageChange, ImageUpload, InputMode, MAX_IMAGE_BYTES, MAX_READING_TIME, MAX_STRING_LEN,
    PostInput,
};
pub use post::{ImageSlot, Post, PostDetails, PostStatus, UnknownStatus};
pub use query::{
    DEFAULT_PER_PAGE, MAX_PAGE, MAX_PER_PAGE, Page, PageRequest, PostFilter, PostQuery, StatusFilter, Viewer,
};
pub use schedule::{PriorSchedule, Schedule, ScheduleInput};
pub use taxonomy::{Author, Category, Tag};
