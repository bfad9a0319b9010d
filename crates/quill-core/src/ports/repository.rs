use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    EngagementCounts, Page, PageRequest, Post, PostDetails, PostFilter, Touch,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Post repository.
///
/// Every read ignores soft-deleted posts, and `delete` soft-deletes.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Write the editable columns of a live post.
    ///
    /// The author, creation time and engagement counters are left as stored;
    /// the returned post carries their current values.
    async fn update(&self, post: Post, touch: Touch) -> Result<Post, RepoError>;

    /// Page through posts matching `filter`, newest publication first.
    async fn list(&self, filter: &PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Attach author, category and tags.
    async fn load_details(&self, posts: Vec<Post>) -> Result<Vec<PostDetails>, RepoError>;

    /// Whether a live post other than `ignore` already uses `slug`.
    async fn slug_exists(&self, slug: &str, ignore: Option<Uuid>) -> Result<bool, RepoError>;

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError>;

    /// The subset of `ids` that name existing tags.
    async fn existing_tag_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, RepoError>;

    /// Replace the post's tag set.
    async fn sync_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;

    /// Record a like; liking twice is not an error.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    /// Remove a like; removing a missing like is not an error.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;

    /// Recount likes and comments from their own tables.
    async fn count_engagement(&self, post_id: Uuid) -> Result<EngagementCounts, RepoError>;

    /// Persist the cache columns.
    async fn store_counters(
        &self,
        post_id: Uuid,
        counts: EngagementCounts,
        touch: Touch,
    ) -> Result<(), RepoError>;

    /// Atomically add one view.
    async fn increment_view_count(&self, post_id: Uuid) -> Result<(), RepoError>;
}
