//! Domain to wire conversion.

use quill_core::domain::{Author, Category, ImageSlot, Page, PostDetails, Tag};
use quill_core::ports::ImageStorage;
use quill_shared::dto::{AuthorResource, CategoryResource, PostResource, TagResource};
use quill_shared::{PageMeta, PaginatedResponse};

pub fn post_resource(details: PostDetails, storage: &dyn ImageStorage) -> PostResource {
    let PostDetails {
        post,
        author,
        category,
        tags,
    } = details;

    let url = |slot: ImageSlot| post.image(slot).map(|path| storage.url(path));
    let featured_image_url = url(ImageSlot::Featured);
    let thumbnail_url = url(ImageSlot::Thumbnail);
    let og_image_url = url(ImageSlot::OpenGraph);

    PostResource {
        id: post.id,
        title: post.title,
        slug: post.slug,
        excerpt: post.excerpt,
        content: post.content,
        status: post.status.as_str().to_string(),
        reading_time: post.reading_time,
        featured_image: post.featured_image,
        featured_image_url,
        thumbnail: post.thumbnail,
        thumbnail_url,
        og_image: post.og_image,
        og_image_url,
        meta_title: post.meta_title,
        meta_description: post.meta_description,
        canonical_url: post.canonical_url,
        published_at: post.published_at,
        scheduled_at: post.scheduled_at,
        view_count: post.view_count,
        likes_count: post.like_count,
        comments_count: post.comment_count,
        allow_comments: post.allow_comments,
        author: author.map(author_resource),
        category: category.map(category_resource),
        tags: tags.into_iter().map(tag_resource).collect(),
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub fn post_page(
    page: Page<PostDetails>,
    storage: &dyn ImageStorage,
) -> PaginatedResponse<PostResource> {
    let meta = PageMeta {
        current_page: page.page,
        per_page: page.per_page,
        total: page.total,
        last_page: page.last_page(),
    };
    PaginatedResponse {
        data: page
            .items
            .into_iter()
            .map(|details| post_resource(details, storage))
            .collect(),
        meta,
    }
}

fn author_resource(author: Author) -> AuthorResource {
    AuthorResource {
        id: author.id,
        name: author.name,
    }
}

fn category_resource(category: Category) -> CategoryResource {
    CategoryResource {
        id: category.id,
        name: category.name,
        slug: category.slug,
    }
}

fn tag_resource(tag: Tag) -> TagResource {
    TagResource {
        id: tag.id,
        name: tag.name,
        slug: tag.slug,
    }
}
