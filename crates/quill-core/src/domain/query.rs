//! Listing filters, pagination and the caller's view of the catalogue.

use std::str::FromStr;

use uuid::Uuid;

use super::post::PostStatus;
use crate::error::FieldErrors;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;
/// Highest page a caller can ask for; later pages are empty anyway.
pub const MAX_PAGE: u64 = 1_000_000_000;

/// Who is asking. Anonymous callers are `None` at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Viewer {
    pub fn is_privileged(viewer: Option<&Viewer>) -> bool {
        viewer.is_some_and(|v| v.is_admin)
    }
}

/// Requested status filter. `All` is only honoured for privileged callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(PostStatus),
}

impl FromStr for StatusFilter {
    type Err = FieldErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(StatusFilter::All);
        }
        s.parse::<PostStatus>().map(StatusFilter::Only).map_err(|_| {
            FieldErrors::single(
                "status",
                "Status filter must be all, published, draft, scheduled, or archived.",
            )
        })
    }
}

/// Raw list request as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Filter handed to the repository after access rules were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

impl PostFilter {
    /// Build the effective filter: callers without privilege only ever see
    /// published posts, whatever they asked for.
    pub fn for_viewer(query: &PostQuery, viewer: Option<&Viewer>) -> Result<Self, FieldErrors> {
        let status = if Viewer::is_privileged(viewer) {
            match query.status.as_deref().filter(|s| !s.is_empty()) {
                None => None,
                Some(raw) => match raw.parse::<StatusFilter>()? {
                    StatusFilter::All => None,
                    StatusFilter::Only(status) => Some(status),
                },
            }
        } else {
            Some(PostStatus::Published)
        };

        Ok(Self {
            status,
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            author_id: query.author_id,
            category_id: query.category_id,
            tag_ids: query.tag_ids.clone(),
        })
    }
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Clamp caller input: page defaults to 1, `per_page` to 10 (also for 0)
    /// and never exceeds 100.
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        let per_page = match per_page {
            None | Some(0) => DEFAULT_PER_PAGE,
            Some(n) => n.min(MAX_PER_PAGE),
        };
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1).min(MAX_PAGE),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Viewer {
        Viewer {
            user_id: Uuid::new_v4(),
            is_admin: true,
        }
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(None, None).per_page, 10);
        assert_eq!(PageRequest::new(None, Some(0)).per_page, 10);
        assert_eq!(PageRequest::new(None, Some(25)).per_page, 25);
        assert_eq!(PageRequest::new(None, Some(1000)).per_page, 100);
        assert_eq!(PageRequest::new(Some(0), None).page, 1);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn oversized_page_is_clamped() {
        let request = PageRequest::new(Some(u64::MAX), Some(100));
        assert_eq!(request.page, MAX_PAGE);
        assert_eq!(request.offset(), (MAX_PAGE - 1) * 100);
        assert!(request.offset() <= i64::MAX as u64);
    }

    #[test]
    fn last_page_rounds_up() {
        let page: Page<()> = Page {
            items: vec![],
            total: 21,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.last_page(), 3);
    }

    #[test]
    fn anonymous_callers_only_see_published() {
        let query = PostQuery {
            status: Some("draft".into()),
            ..Default::default()
        };
        let filter = PostFilter::for_viewer(&query, None).unwrap();
        assert_eq!(filter.status, Some(PostStatus::Published));

        let member = Viewer {
            user_id: Uuid::new_v4(),
            is_admin: false,
        };
        let filter = PostFilter::for_viewer(&query, Some(&member)).unwrap();
        assert_eq!(filter.status, Some(PostStatus::Published));
    }

    #[test]
    fn admins_may_filter_by_any_status() {
        let viewer = admin();
        let query = PostQuery {
            status: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(PostFilter::for_viewer(&query, Some(&viewer)).unwrap().status, None);

        let query = PostQuery {
            status: Some("scheduled".into()),
            ..Default::default()
        };
        assert_eq!(
            PostFilter::for_viewer(&query, Some(&viewer)).unwrap().status,
            Some(PostStatus::Scheduled)
        );
    }

    #[test]
    fn unknown_status_filter_is_a_validation_error() {
        let query = PostQuery {
            status: Some("trashed".into()),
            ..Default::default()
        };
        let errors = PostFilter::for_viewer(&query, Some(&admin())).unwrap_err();
        assert!(errors.contains("status"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = PostQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(PostFilter::for_viewer(&query, None).unwrap().search, None);
    }
}
