//! In-memory post repository - used when no database is configured.
//!
//! Data is lost on process restart.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{
    Author, Category, EngagementCounts, Page, PageRequest, Post, PostDetails, PostFilter, Tag,
    Touch,
};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository};

#[derive(Default)]
struct Store {
    posts: HashMap<Uuid, Post>,
    authors: HashMap<Uuid, Author>,
    categories: HashMap<Uuid, Category>,
    tags: HashMap<Uuid, Tag>,
    post_tags: HashMap<Uuid, BTreeSet<Uuid>>,
    likes: HashSet<(Uuid, Uuid)>,
    comments: HashMap<Uuid, u64>,
}

impl Store {
    fn live(&self, id: Uuid) -> Option<&Post> {
        self.posts.get(&id).filter(|p| !p.is_deleted())
    }

    fn matches(&self, post: &Post, filter: &PostFilter) -> bool {
        if post.is_deleted() {
            return false;
        }
        if filter.status.is_some_and(|s| post.status != s) {
            return false;
        }
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if filter.author_id.is_some_and(|a| post.user_id != a) {
            return false;
        }
        if filter.category_id.is_some() && post.category_id != filter.category_id {
            return false;
        }
        if !filter.tag_ids.is_empty() {
            let Some(attached) = self.post_tags.get(&post.id) else {
                return false;
            };
            if !filter.tag_ids.iter().any(|t| attached.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Newest publication first, unpublished last, then newest created.
fn listing_order(a: &Post, b: &Post) -> Ordering {
    let by_published = match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_published.then_with(|| b.created_at.cmp(&a.created_at))
}

/// In-memory post repository using HashMaps behind an async RwLock.
pub struct InMemoryPostRepository {
    store: RwLock<Store>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }

    pub async fn add_author(&self, author: Author) {
        self.store.write().await.authors.insert(author.id, author);
    }

    pub async fn add_category(&self, category: Category) {
        self.store
            .write()
            .await
            .categories
            .insert(category.id, category);
    }

    pub async fn add_tag(&self, tag: Tag) {
        self.store.write().await.tags.insert(tag.id, tag);
    }

    /// Record a comment against a post. Counters are not touched.
    pub async fn add_comment(&self, post_id: Uuid) {
        *self.store.write().await.comments.entry(post_id).or_default() += 1;
    }

    /// Raw row lookup, soft-deleted posts included.
    pub async fn raw(&self, id: Uuid) -> Option<Post> {
        self.store.read().await.posts.get(&id).cloned()
    }
}

impl Default for InMemoryPostRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.read().await.live(id).cloned())
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;

        if store.posts.contains_key(&entity.id) {
            return Err(RepoError::Constraint(format!("posts_pkey: {}", entity.id)));
        }
        if store
            .posts
            .values()
            .any(|p| !p.is_deleted() && p.slug == entity.slug)
        {
            return Err(RepoError::Constraint(format!("posts_slug: {}", entity.slug)));
        }

        store.posts.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut store = self.store.write().await;
        match store.posts.get_mut(&id) {
            Some(post) if !post.is_deleted() => {
                post.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn update(&self, mut entity: Post, touch: Touch) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;

        let Some(stored) = store.live(entity.id) else {
            return Err(RepoError::NotFound);
        };
        entity.user_id = stored.user_id;
        entity.view_count = stored.view_count;
        entity.like_count = stored.like_count;
        entity.comment_count = stored.comment_count;
        entity.created_at = stored.created_at;

        if store
            .posts
            .values()
            .any(|p| p.id != entity.id && !p.is_deleted() && p.slug == entity.slug)
        {
            return Err(RepoError::Constraint(format!("posts_slug: {}", entity.slug)));
        }

        if touch == Touch::Bump {
            entity.updated_at = Utc::now();
        }
        store.posts.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn list(&self, filter: &PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let store = self.store.read().await;

        let mut matching: Vec<&Post> = store
            .posts
            .values()
            .filter(|p| store.matches(p, filter))
            .collect();
        matching.sort_by(|a, b| listing_order(a, b));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn load_details(&self, posts: Vec<Post>) -> Result<Vec<PostDetails>, RepoError> {
        let store = self.store.read().await;

        Ok(posts
            .into_iter()
            .map(|post| {
                let mut tags: Vec<Tag> = store
                    .post_tags
                    .get(&post.id)
                    .map(|ids| ids.iter().filter_map(|id| store.tags.get(id).cloned()).collect())
                    .unwrap_or_default();
                tags.sort_by(|a, b| a.name.cmp(&b.name));

                PostDetails {
                    author: store.authors.get(&post.user_id).cloned(),
                    category: post
                        .category_id
                        .and_then(|id| store.categories.get(&id).cloned()),
                    tags,
                    post,
                }
            })
            .collect())
    }

    async fn slug_exists(&self, slug: &str, ignore: Option<Uuid>) -> Result<bool, RepoError> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .values()
            .any(|p| !p.is_deleted() && p.slug == slug && Some(p.id) != ignore))
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.store.read().await.categories.contains_key(&id))
    }

    async fn existing_tag_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, RepoError> {
        let store = self.store.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| store.tags.contains_key(id))
            .collect())
    }

    async fn sync_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut store = self.store.write().await;
        if tag_ids.iter().any(|id| !store.tags.contains_key(id)) {
            return Err(RepoError::Constraint("post_tag_tag_id_fkey".to_string()));
        }
        store
            .post_tags
            .insert(post_id, tag_ids.iter().copied().collect());
        Ok(())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        self.store.write().await.likes.insert((post_id, user_id));
        Ok(())
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        self.store.write().await.likes.remove(&(post_id, user_id));
        Ok(())
    }

    async fn count_engagement(&self, post_id: Uuid) -> Result<EngagementCounts, RepoError> {
        let store = self.store.read().await;
        let like_count = store.likes.iter().filter(|(p, _)| *p == post_id).count() as i64;
        let comment_count = store.comments.get(&post_id).copied().unwrap_or(0) as i64;
        Ok(EngagementCounts {
            like_count,
            comment_count,
        })
    }

    async fn store_counters(
        &self,
        post_id: Uuid,
        counts: EngagementCounts,
        touch: Touch,
    ) -> Result<(), RepoError> {
        let mut store = self.store.write().await;
        if let Some(post) = store.posts.get_mut(&post_id) {
            post.like_count = counts.like_count;
            post.comment_count = counts.comment_count;
            if touch == Touch::Bump {
                post.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn increment_view_count(&self, post_id: Uuid) -> Result<(), RepoError> {
        let mut store = self.store.write().await;
        if let Some(post) = store.posts.get_mut(&post_id).filter(|p| !p.is_deleted()) {
            post.view_count += 1;
        }
        Ok(())
    }
}
