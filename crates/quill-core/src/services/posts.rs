//! Post lifecycle use cases.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::schedule::reconcile;
use crate::domain::{
    EngagementCounts, ImageChange, ImageSlot, InputMode, LikeOutcome, Page, PageRequest, Post,
    PostDetails, PostFilter, PostInput, PostQuery, PriorSchedule, Touch, Viewer, reading_time,
    slug,
};
use crate::error::{DomainError, FieldErrors};
use crate::ports::{ImageStorage, PostRepository};

/// Storage directory for post images.
pub const IMAGE_DIRECTORY: &str = "posts";

#[derive(Debug, Clone, Default)]
pub struct PostServiceConfig {
    /// Delete stored images when a post is soft-deleted.
    pub purge_images_on_delete: bool,
}

/// Paths touched while applying image changes.
#[derive(Debug, Default)]
struct ImageWrites {
    /// Newly stored files, to discard if the database write fails.
    stored: Vec<String>,
    /// Files replaced or removed, to delete once the write succeeded.
    obsolete: Vec<String>,
}

/// Orchestrates the post lifecycle over the repository and image storage.
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    storage: Arc<dyn ImageStorage>,
    config: PostServiceConfig,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        storage: Arc<dyn ImageStorage>,
        config: PostServiceConfig,
    ) -> Self {
        Self {
            repo,
            storage,
            config,
        }
    }

    pub fn storage(&self) -> &dyn ImageStorage {
        self.storage.as_ref()
    }

    /// Paginated listing, restricted to published posts for non-admins.
    pub async fn list(
        &self,
        query: &PostQuery,
        viewer: Option<&Viewer>,
    ) -> Result<Page<PostDetails>, DomainError> {
        let filter = PostFilter::for_viewer(query, viewer).map_err(DomainError::Validation)?;
        let request = PageRequest::new(query.page, query.per_page);

        let page = self.repo.list(&filter, request).await?;
        let Page {
            items,
            total,
            page,
            per_page,
        } = page;
        let items = self.repo.load_details(items).await?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Read one post. Unpublished posts are invisible to non-admins and
    /// published reads count as a view.
    pub async fn show(&self, id: Uuid, viewer: Option<&Viewer>) -> Result<PostDetails, DomainError> {
        let post = self.find_live(id).await?;

        if !post.is_published() && !Viewer::is_privileged(viewer) {
            return Err(DomainError::post_not_found(id));
        }

        let post = if post.is_published() {
            self.repo.increment_view_count(id).await?;
            self.find_live(id).await?
        } else {
            post
        };

        self.details(post).await
    }

    pub async fn create(&self, viewer: &Viewer, input: PostInput) -> Result<PostDetails, DomainError> {
        require_admin(viewer)?;

        let mut errors = input.validate(InputMode::Create);
        errors.merge(self.check_references(&input, None).await?);
        errors.into_result()?;

        let schedule =
            reconcile(&input.schedule, None, Utc::now()).map_err(DomainError::Validation)?;

        let title = input.title.clone().unwrap_or_default();
        let content = input.content.clone().unwrap_or_default();
        let slug = match input.slug.clone().flatten() {
            Some(slug) => slug,
            None => self.allocate_slug(&title, None).await?,
        };

        let mut post = Post::new(viewer.user_id, title, slug, content);
        apply_fields(&mut post, &input);
        post.reading_time = input
            .reading_time
            .flatten()
            .unwrap_or_else(|| reading_time::estimate(&post.content));
        schedule.apply_to(&mut post);

        let writes = self.apply_images(&mut post, &input, None).await?;

        let saved = match self.repo.save(post).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard(&writes.stored).await;
                return Err(e.into());
            }
        };

        if let Some(tags) = input.tags.as_deref().filter(|t| !t.is_empty()) {
            if let Err(e) = self.repo.sync_tags(saved.id, tags).await {
                tracing::warn!(post_id = %saved.id, error = %e, "Tag sync failed, withdrawing new post");
                if let Err(e) = self.repo.delete(saved.id).await {
                    tracing::error!(post_id = %saved.id, error = %e, "Failed to withdraw post");
                }
                self.discard(&writes.stored).await;
                return Err(e.into());
            }
        }

        tracing::info!(
            post_id = %saved.id,
            slug = %saved.slug,
            status = %saved.status,
            "Post created"
        );

        self.details(saved).await
    }

    pub async fn update(
        &self,
        viewer: &Viewer,
        id: Uuid,
        input: PostInput,
    ) -> Result<PostDetails, DomainError> {
        require_admin(viewer)?;

        let current = self.find_live(id).await?;

        let mut errors = input.validate(InputMode::Update);
        errors.merge(self.check_references(&input, Some(id)).await?);
        errors.into_result()?;

        let schedule = reconcile(
            &input.schedule,
            Some(PriorSchedule::from(&current)),
            Utc::now(),
        )
        .map_err(DomainError::Validation)?;

        let mut post = current.clone();

        if let Some(requested) = &input.slug {
            post.slug = match requested {
                Some(slug) => slug.clone(),
                None => {
                    let title = input.title.as_deref().unwrap_or(&current.title);
                    self.allocate_slug(title, Some(id)).await?
                }
            };
        }

        apply_fields(&mut post, &input);

        match input.reading_time.flatten() {
            Some(minutes) => post.reading_time = minutes,
            None if input.content.is_some() => {
                post.reading_time = reading_time::estimate(&post.content)
            }
            None => {}
        }

        schedule.apply_to(&mut post);

        let writes = self.apply_images(&mut post, &input, Some(&current)).await?;

        let saved = match self.repo.update(post, Touch::Bump).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard(&writes.stored).await;
                return Err(e.into());
            }
        };

        // The row now points at the new files either way.
        self.discard(&writes.obsolete).await;

        if let Some(tags) = &input.tags {
            self.repo.sync_tags(id, tags).await?;
        }

        tracing::info!(
            post_id = %saved.id,
            status = %saved.status,
            "Post updated"
        );

        self.details(saved).await
    }

    /// Soft delete.
    pub async fn delete(&self, viewer: &Viewer, id: Uuid) -> Result<(), DomainError> {
        require_admin(viewer)?;

        let post = self.find_live(id).await?;
        self.repo.delete(id).await?;

        if self.config.purge_images_on_delete {
            let paths: Vec<String> = post.image_paths().into_iter().map(String::from).collect();
            self.discard(&paths).await;
        }

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, DomainError> {
        self.find_live(id).await?;
        self.repo.add_like(id, user_id).await?;
        let counts = self.refresh_engagement_counts(id).await?;

        tracing::debug!(post_id = %id, user_id = %user_id, likes = counts.like_count, "Post liked");

        Ok(LikeOutcome {
            liked: true,
            likes_count: counts.like_count,
        })
    }

    pub async fn unlike(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, DomainError> {
        self.find_live(id).await?;
        self.repo.remove_like(id, user_id).await?;
        let counts = self.refresh_engagement_counts(id).await?;

        tracing::debug!(post_id = %id, user_id = %user_id, likes = counts.like_count, "Post unliked");

        Ok(LikeOutcome {
            liked: false,
            likes_count: counts.like_count,
        })
    }

    /// Recount likes and comments and store them without touching `updated_at`.
    pub async fn refresh_engagement_counts(&self, id: Uuid) -> Result<EngagementCounts, DomainError> {
        let counts = self.repo.count_engagement(id).await?;
        self.repo.store_counters(id, counts, Touch::Quiet).await?;
        Ok(counts)
    }

    async fn find_live(&self, id: Uuid) -> Result<Post, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(id))
    }

    async fn details(&self, post: Post) -> Result<PostDetails, DomainError> {
        let id = post.id;
        self.repo
            .load_details(vec![post])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::post_not_found(id))
    }

    async fn allocate_slug(&self, title: &str, ignore: Option<Uuid>) -> Result<String, DomainError> {
        let repo = self.repo.as_ref();
        let slug = slug::allocate(title, |candidate| async move {
            repo.slug_exists(&candidate, ignore).await
        })
        .await?;
        Ok(slug)
    }

    /// Lookups the payload rules depend on: slug uniqueness, category and
    /// tag existence.
    async fn check_references(
        &self,
        input: &PostInput,
        ignore: Option<Uuid>,
    ) -> Result<FieldErrors, DomainError> {
        let mut errors = FieldErrors::new();

        if let Some(Some(requested)) = &input.slug {
            if slug::is_alpha_dash(requested) && self.repo.slug_exists(requested, ignore).await? {
                errors.add("slug", "The slug has already been taken.");
            }
        }

        if let Some(Some(category_id)) = input.category_id {
            if !self.repo.category_exists(category_id).await? {
                errors.add("category_id", "The selected category id is invalid.");
            }
        }

        if let Some(tags) = input.tags.as_deref().filter(|t| !t.is_empty()) {
            let existing = self.repo.existing_tag_ids(tags).await?;
            for (index, tag) in tags.iter().enumerate() {
                if !existing.contains(tag) {
                    let field = format!("tags.{}", index);
                    errors.add(field.clone(), format!("The selected {} is invalid.", field));
                }
            }
        }

        Ok(errors)
    }

    async fn apply_images(
        &self,
        post: &mut Post,
        input: &PostInput,
        previous: Option<&Post>,
    ) -> Result<ImageWrites, DomainError> {
        let mut writes = ImageWrites::default();

        for slot in ImageSlot::ALL {
            let old = previous.and_then(|p| p.image(slot)).map(String::from);
            match input.image(slot) {
                ImageChange::Keep => {}
                ImageChange::Remove => {
                    writes.obsolete.extend(old);
                    post.set_image(slot, None);
                }
                ImageChange::Replace(upload) => {
                    let path = match self.storage.store(IMAGE_DIRECTORY, upload).await {
                        Ok(path) => path,
                        Err(e) => {
                            self.discard(&writes.stored).await;
                            return Err(e.into());
                        }
                    };
                    tracing::debug!(slot = slot.field(), path = %path, "Stored post image");
                    writes.stored.push(path.clone());
                    writes.obsolete.extend(old);
                    post.set_image(slot, Some(path));
                }
            }
        }

        Ok(writes)
    }

    async fn discard(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.storage.delete(path).await {
                tracing::warn!(path = %path, error = %e, "Failed to delete stored image");
            }
        }
    }
}

fn require_admin(viewer: &Viewer) -> Result<(), DomainError> {
    if viewer.is_admin {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

/// Copy the plain payload fields onto the post.
fn apply_fields(post: &mut Post, input: &PostInput) {
    if let Some(title) = &input.title {
        post.title = title.clone();
    }
    if let Some(content) = &input.content {
        post.content = content.clone();
    }
    if let Some(excerpt) = &input.excerpt {
        post.excerpt = excerpt.clone();
    }
    if let Some(meta_title) = &input.meta_title {
        post.meta_title = meta_title.clone();
    }
    if let Some(meta_description) = &input.meta_description {
        post.meta_description = meta_description.clone();
    }
    if let Some(canonical_url) = &input.canonical_url {
        post.canonical_url = canonical_url.clone();
    }
    if let Some(category_id) = input.category_id {
        post.category_id = category_id;
    }
    if let Some(allow_comments) = input.allow_comments {
        post.allow_comments = allow_comments;
    }
}
