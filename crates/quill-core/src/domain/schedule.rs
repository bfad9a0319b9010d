//! Status/timestamp reconciliation.
//!
//! A post's `status` decides which of `published_at` and `scheduled_at` may
//! be set. [`reconcile`] resolves both timestamps for a requested status
//! given the payload and the post's prior state.

use chrono::{DateTime, Utc};

use super::post::{Post, PostStatus};
use crate::error::FieldErrors;

/// Status-related part of a create/update payload.
///
/// The outer `Option` records whether the key was present at all, the inner
/// one whether it carried a value or an explicit null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleInput {
    pub status: Option<PostStatus>,
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
}

/// Resolved lifecycle fields, ready to be written to the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn apply_to(self, post: &mut Post) {
        post.status = self.status;
        post.published_at = self.published_at;
        post.scheduled_at = self.scheduled_at;
    }
}

/// Lifecycle fields of the stored post, absent on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorSchedule {
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl From<&Post> for PriorSchedule {
    fn from(post: &Post) -> Self {
        Self {
            status: post.status,
            published_at: post.published_at,
            scheduled_at: post.scheduled_at,
        }
    }
}

/// Resolve status, `published_at` and `scheduled_at`.
///
/// | status    | published_at                          | scheduled_at              |
/// |-----------|---------------------------------------|---------------------------|
/// | published | payload, else prior, else `now`       | null                      |
/// | scheduled | null                                  | payload, else prior, else error |
/// | archived  | payload if key present, else prior    | null                      |
/// | draft     | payload if key present, else null     | null                      |
pub fn reconcile(
    input: &ScheduleInput,
    prior: Option<PriorSchedule>,
    now: DateTime<Utc>,
) -> Result<Schedule, FieldErrors> {
    let status = input
        .status
        .or(prior.map(|p| p.status))
        .unwrap_or_default();
    let prior_published = prior.and_then(|p| p.published_at);
    let prior_scheduled = prior.and_then(|p| p.scheduled_at);

    let schedule = match status {
        PostStatus::Published => Schedule {
            status,
            published_at: Some(
                input
                    .published_at
                    .flatten()
                    .or(prior_published)
                    .unwrap_or(now),
            ),
            scheduled_at: None,
        },
        PostStatus::Scheduled => {
            let scheduled_at = input.scheduled_at.flatten().or(prior_scheduled);
            if scheduled_at.is_none() {
                return Err(FieldErrors::single(
                    "scheduled_at",
                    "Scheduled posts must include a schedule datetime.",
                ));
            }
            Schedule {
                status,
                published_at: None,
                scheduled_at,
            }
        }
        PostStatus::Archived => Schedule {
            status,
            published_at: input.published_at.unwrap_or(prior_published),
            scheduled_at: None,
        },
        PostStatus::Draft => Schedule {
            status,
            published_at: input.published_at.unwrap_or(None),
            scheduled_at: None,
        },
    };

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, 12, 0, 0).unwrap()
    }

    fn prior(status: PostStatus, published: Option<u32>, scheduled: Option<u32>) -> PriorSchedule {
        PriorSchedule {
            status,
            published_at: published.map(at),
            scheduled_at: scheduled.map(at),
        }
    }

    #[test]
    fn creation_defaults_to_draft_without_timestamps() {
        let schedule = reconcile(&ScheduleInput::default(), None, at(1)).unwrap();
        assert_eq!(schedule.status, PostStatus::Draft);
        assert_eq!(schedule.published_at, None);
        assert_eq!(schedule.scheduled_at, None);
    }

    #[test]
    fn publishing_a_draft_stamps_now() {
        let input = ScheduleInput {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Draft, None, None)), at(5)).unwrap();
        assert_eq!(schedule.published_at, Some(at(5)));
        assert_eq!(schedule.scheduled_at, None);
    }

    #[test]
    fn publishing_keeps_an_existing_publish_date() {
        let input = ScheduleInput {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Archived, Some(2), None)), at(5)).unwrap();
        assert_eq!(schedule.published_at, Some(at(2)));
    }

    #[test]
    fn explicit_null_publish_date_still_resolves_for_published() {
        let input = ScheduleInput {
            status: Some(PostStatus::Published),
            published_at: Some(None),
            ..Default::default()
        };
        let schedule = reconcile(&input, None, at(9)).unwrap();
        assert_eq!(schedule.published_at, Some(at(9)));
    }

    #[test]
    fn publishing_clears_a_pending_schedule() {
        let input = ScheduleInput {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Scheduled, None, Some(20))), at(5)).unwrap();
        assert_eq!(schedule.scheduled_at, None);
        assert_eq!(schedule.published_at, Some(at(5)));
    }

    #[test]
    fn scheduling_without_a_date_fails_on_scheduled_at() {
        let input = ScheduleInput {
            status: Some(PostStatus::Scheduled),
            ..Default::default()
        };
        let errors = reconcile(&input, None, at(1)).unwrap_err();
        assert!(errors.contains("scheduled_at"));

        let from_draft = reconcile(&input, Some(prior(PostStatus::Draft, None, None)), at(1));
        assert!(from_draft.is_err());
    }

    #[test]
    fn scheduling_uses_payload_then_prior_date() {
        let input = ScheduleInput {
            status: Some(PostStatus::Scheduled),
            scheduled_at: Some(Some(at(25))),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Published, Some(1), None)), at(2)).unwrap();
        assert_eq!(schedule.scheduled_at, Some(at(25)));
        assert_eq!(schedule.published_at, None);

        let keep = ScheduleInput::default();
        let schedule =
            reconcile(&keep, Some(prior(PostStatus::Scheduled, None, Some(30))), at(2)).unwrap();
        assert_eq!(schedule.status, PostStatus::Scheduled);
        assert_eq!(schedule.scheduled_at, Some(at(30)));
    }

    #[test]
    fn unpublishing_to_draft_clears_publish_date() {
        let input = ScheduleInput {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Published, Some(3), None)), at(5)).unwrap();
        assert_eq!(schedule.published_at, None);
    }

    #[test]
    fn draft_respects_an_explicit_publish_date() {
        let input = ScheduleInput {
            status: Some(PostStatus::Draft),
            published_at: Some(Some(at(4))),
            ..Default::default()
        };
        let schedule = reconcile(&input, None, at(5)).unwrap();
        assert_eq!(schedule.published_at, Some(at(4)));
    }

    #[test]
    fn archiving_preserves_the_publish_date() {
        let input = ScheduleInput {
            status: Some(PostStatus::Archived),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Published, Some(3), None)), at(5)).unwrap();
        assert_eq!(schedule.published_at, Some(at(3)));
        assert_eq!(schedule.scheduled_at, None);
    }

    #[test]
    fn archiving_honours_explicit_null() {
        let input = ScheduleInput {
            status: Some(PostStatus::Archived),
            published_at: Some(None),
            ..Default::default()
        };
        let schedule =
            reconcile(&input, Some(prior(PostStatus::Published, Some(3), None)), at(5)).unwrap();
        assert_eq!(schedule.published_at, None);
    }

    #[test]
    fn status_falls_back_to_prior() {
        let schedule = reconcile(
            &ScheduleInput::default(),
            Some(prior(PostStatus::Published, Some(3), None)),
            at(5),
        )
        .unwrap();
        assert_eq!(schedule.status, PostStatus::Published);
        assert_eq!(schedule.published_at, Some(at(3)));
    }
}
