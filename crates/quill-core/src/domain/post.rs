use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::taxonomy::{Author, Category, Tag};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
    Archived,
}

impl PostStatus {
    pub const ALL: [PostStatus; 4] = [
        PostStatus::Draft,
        PostStatus::Scheduled,
        PostStatus::Published,
        PostStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The three image slots a post carries. Each holds a storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Featured,
    Thumbnail,
    OpenGraph,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 3] = [ImageSlot::Featured, ImageSlot::Thumbnail, ImageSlot::OpenGraph];

    /// Payload field name of the slot.
    pub fn field(&self) -> &'static str {
        match self {
            ImageSlot::Featured => "featured_image",
            ImageSlot::Thumbnail => "thumbnail",
            ImageSlot::OpenGraph => "og_image",
        }
    }
}

/// Post entity - a blog post and its lifecycle fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub thumbnail: Option<String>,
    pub og_image: Option<String>,
    pub reading_time: i32,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub allow_comments: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a new draft post.
    pub fn new(user_id: Uuid, title: String, slug: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            category_id: None,
            title,
            slug,
            excerpt: None,
            content,
            featured_image: None,
            thumbnail: None,
            og_image: None,
            reading_time: 1,
            meta_title: None,
            meta_description: None,
            canonical_url: None,
            status: PostStatus::Draft,
            published_at: None,
            scheduled_at: None,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            allow_comments: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Featured => self.featured_image.as_deref(),
            ImageSlot::Thumbnail => self.thumbnail.as_deref(),
            ImageSlot::OpenGraph => self.og_image.as_deref(),
        }
    }

    pub fn set_image(&mut self, slot: ImageSlot, path: Option<String>) {
        match slot {
            ImageSlot::Featured => self.featured_image = path,
            ImageSlot::Thumbnail => self.thumbnail = path,
            ImageSlot::OpenGraph => self.og_image = path,
        }
    }

    /// All stored image paths, in slot order.
    pub fn image_paths(&self) -> Vec<&str> {
        ImageSlot::ALL
            .iter()
            .filter_map(|slot| self.image(*slot))
            .collect()
    }
}

/// A post together with the associations rendered alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: Post,
    pub author: Option<Author>,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl PostDetails {
    pub fn bare(post: Post) -> Self {
        Self {
            post,
            author: None,
            category: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in PostStatus::ALL {
            assert_eq!(status.as_str().parse::<PostStatus>(), Ok(status));
        }
        assert!("deleted".parse::<PostStatus>().is_err());
    }

    #[test]
    fn new_post_defaults_to_draft_with_comments_enabled() {
        let post = Post::new(Uuid::new_v4(), "Hello".into(), "hello".into(), "Body".into());
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.allow_comments);
        assert!(post.published_at.is_none());
        assert_eq!(post.like_count, 0);
    }

    #[test]
    fn image_slots_address_their_own_columns() {
        let mut post = Post::new(Uuid::new_v4(), "t".into(), "t".into(), "c".into());
        post.set_image(ImageSlot::Thumbnail, Some("posts/a.png".into()));
        post.set_image(ImageSlot::OpenGraph, Some("posts/b.png".into()));

        assert_eq!(post.image(ImageSlot::Featured), None);
        assert_eq!(post.image_paths(), vec!["posts/a.png", "posts/b.png"]);
    }
}
