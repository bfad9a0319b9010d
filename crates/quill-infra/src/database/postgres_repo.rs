//! PostgreSQL repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, NullOrdering, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, DbErr, EntityTrait, NotSet, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use quill_core::domain::{
    Author, Category, EngagementCounts, Page, PageRequest, Post, PostDetails, PostFilter, Tag,
    Touch,
};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository};

use super::entity::{category, comment, like, post, post_tag, tag, user};
use super::entity::post::Entity as PostEntity;

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    pub(crate) db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> RepoError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => RepoError::Constraint(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => RepoError::Constraint(msg),
        _ => match e {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => RepoError::NotFound,
            _ => RepoError::Query(e.to_string()),
        },
    }
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Case-insensitive substring match on a text column.
fn icontains(column: post::Column, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .filter(post::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let active_model: post::ActiveModel = entity.into();
        let model = active_model.insert(&self.db).await.map_err(db_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = PostEntity::update_many()
            .col_expr(post::Column::DeletedAt, Expr::value(now))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn update(&self, mut entity: Post, touch: Touch) -> Result<Post, RepoError> {
        if touch == Touch::Bump {
            entity.updated_at = Utc::now();
        }
        let mut active_model: post::ActiveModel = entity.into();
        // Counters belong to the like/view writers; ownership and lifecycle
        // columns never change here.
        active_model.user_id = NotSet;
        active_model.view_count = NotSet;
        active_model.like_count = NotSet;
        active_model.comment_count = NotSet;
        active_model.created_at = NotSet;
        active_model.deleted_at = NotSet;

        let model = PostEntity::update(active_model)
            .filter(post::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.into())
    }

    async fn list(&self, filter: &PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let mut select = PostEntity::find().filter(post::Column::DeletedAt.is_null());

        if let Some(status) = filter.status {
            select = select.filter(post::Column::Status.eq(post::Status::from(status)));
        }

        if let Some(search) = &filter.search {
            select = select.filter(
                Condition::any()
                    .add(icontains(post::Column::Title, search))
                    .add(icontains(post::Column::Content, search)),
            );
        }

        if let Some(author_id) = filter.author_id {
            select = select.filter(post::Column::UserId.eq(author_id));
        }

        if let Some(category_id) = filter.category_id {
            select = select.filter(post::Column::CategoryId.eq(category_id));
        }

        if !filter.tag_ids.is_empty() {
            select = select.filter(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(post_tag::Column::PostId)
                        .from(post_tag::Entity)
                        .and_where(post_tag::Column::TagId.is_in(filter.tag_ids.clone()))
                        .to_owned(),
                ),
            );
        }

        let paginator = select
            .order_by_with_nulls(post::Column::PublishedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(post::Column::CreatedAt)
            .paginate(&self.db, page.per_page);

        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator.fetch_page(page.page - 1).await.map_err(db_err)?;

        tracing::debug!(total, page = page.page, "Listed posts");

        Ok(Page {
            items: models.into_iter().map(Into::into).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn load_details(&self, posts: Vec<Post>) -> Result<Vec<PostDetails>, RepoError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let user_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        let category_ids: Vec<Uuid> = posts.iter().filter_map(|p| p.category_id).collect();

        let authors: HashMap<Uuid, Author> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect();

        let categories: HashMap<Uuid, Category> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            category::Entity::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|m| (m.id, m.into()))
                .collect()
        };

        let pivots = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let tags: HashMap<Uuid, Tag> = if pivots.is_empty() {
            HashMap::new()
        } else {
            tag::Entity::find()
                .filter(tag::Column::Id.is_in(pivots.iter().map(|p| p.tag_id).collect::<Vec<_>>()))
                .order_by_asc(tag::Column::Name)
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|m| (m.id, m.into()))
                .collect()
        };

        let mut tags_by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for pivot in &pivots {
            if let Some(tag) = tags.get(&pivot.tag_id) {
                tags_by_post.entry(pivot.post_id).or_default().push(tag.clone());
            }
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let mut post_tags = tags_by_post.remove(&post.id).unwrap_or_default();
                post_tags.sort_by(|a, b| a.name.cmp(&b.name));
                PostDetails {
                    author: authors.get(&post.user_id).cloned(),
                    category: post.category_id.and_then(|id| categories.get(&id).cloned()),
                    tags: post_tags,
                    post,
                }
            })
            .collect())
    }

    async fn slug_exists(&self, slug: &str, ignore: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::DeletedAt.is_null());

        if let Some(id) = ignore {
            query = query.filter(post::Column::Id.ne(id));
        }

        let count = query.count(&self.db).await.map_err(db_err)?;
        Ok(count > 0)
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let found = category::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    async fn existing_tag_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = tag::Entity::find()
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(found.into_iter().map(|t| t.id).collect())
    }

    async fn sync_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut unique = tag_ids.to_vec();
        unique.sort();
        unique.dedup();

        let txn = self.db.begin().await.map_err(db_err)?;

        post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !unique.is_empty() {
            let rows = unique.iter().map(|tag_id| post_tag::ActiveModel {
                post_id: Set(post_id),
                tag_id: Set(*tag_id),
            });
            post_tag::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        tracing::debug!(post_id = %post_id, tags = unique.len(), "Synced post tags");
        Ok(())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let existing = like::Entity::find()
            .filter(like::Column::PostId.eq(post_id))
            .filter(like::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_some() {
            return Ok(());
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let row = like::ActiveModel {
            id: Set(Uuid::new_v4()),
            post_id: Set(post_id),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match row.insert(&self.db).await {
            Ok(_) => Ok(()),
            // Lost a race against the same user's other request.
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(post_id = %post_id, user_id = %user_id, "Like already recorded");
                Ok(())
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        like::Entity::delete_many()
            .filter(like::Column::PostId.eq(post_id))
            .filter(like::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn count_engagement(&self, post_id: Uuid) -> Result<EngagementCounts, RepoError> {
        let likes = like::Entity::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        Ok(EngagementCounts {
            like_count: likes as i64,
            comment_count: comments as i64,
        })
    }

    async fn store_counters(
        &self,
        post_id: Uuid,
        counts: EngagementCounts,
        touch: Touch,
    ) -> Result<(), RepoError> {
        let mut update = PostEntity::update_many()
            .col_expr(post::Column::LikeCount, Expr::value(counts.like_count))
            .col_expr(post::Column::CommentCount, Expr::value(counts.comment_count));

        if touch == Touch::Bump {
            let now: DateTimeWithTimeZone = Utc::now().into();
            update = update.col_expr(post::Column::UpdatedAt, Expr::value(now));
        }

        update
            .filter(post::Column::Id.eq(post_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn increment_view_count(&self, post_id: Uuid) -> Result<(), RepoError> {
        PostEntity::update_many()
            .col_expr(
                post::Column::ViewCount,
                Expr::col(post::Column::ViewCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .filter(post::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
