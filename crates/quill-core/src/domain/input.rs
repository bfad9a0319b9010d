//! Create/update payloads and their validation rules.

use uuid::Uuid;

use super::post::ImageSlot;
use super::schedule::ScheduleInput;
use super::slug::is_alpha_dash;
use crate::error::FieldErrors;

pub const MAX_STRING_LEN: usize = 255;
pub const MAX_READING_TIME: i32 = 1440;
pub const MAX_IMAGE_BYTES: usize = 4096 * 1024;

/// An uploaded image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Image type detected from the file signature.
    fn sniffed(&self) -> Option<infer::Type> {
        infer::get(&self.bytes).filter(|t| t.matcher_type() == infer::MatcherType::Image)
    }

    /// Judged by content; the declared content type is not trusted.
    pub fn is_image(&self) -> bool {
        self.sniffed().is_some()
    }

    /// Extension of the detected image type, else the lowercase extension
    /// of the file name, else `bin`.
    pub fn extension(&self) -> String {
        if let Some(kind) = self.sniffed() {
            return kind.extension().to_string();
        }
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }
}

/// What to do with one image slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    #[default]
    Keep,
    Remove,
    Replace(ImageUpload),
}

/// Whether a payload creates a post or patches an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Create,
    Update,
}

/// Parsed post payload.
///
/// `Option<Option<T>>` fields distinguish "key absent" (`None`) from
/// "explicit null" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostInput {
    pub title: Option<String>,
    pub slug: Option<Option<String>>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub reading_time: Option<Option<i32>>,
    pub schedule: ScheduleInput,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub canonical_url: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<Uuid>>,
    pub allow_comments: Option<bool>,
    pub featured_image: ImageChange,
    pub thumbnail: ImageChange,
    pub og_image: ImageChange,
}

impl PostInput {
    pub fn image(&self, slot: ImageSlot) -> &ImageChange {
        match slot {
            ImageSlot::Featured => &self.featured_image,
            ImageSlot::Thumbnail => &self.thumbnail,
            ImageSlot::OpenGraph => &self.og_image,
        }
    }

    /// Value rules that need no persistence lookups.
    pub fn validate(&self, mode: InputMode) -> FieldErrors {
        let mut errors = FieldErrors::new();

        match self.title.as_deref() {
            None if mode == InputMode::Create => {
                errors.add("title", "The title field is required.")
            }
            Some("") => errors.add("title", "The title field is required."),
            Some(title) => check_length(&mut errors, "title", title),
            None => {}
        }

        match self.content.as_deref() {
            None if mode == InputMode::Create => {
                errors.add("content", "The content field is required.")
            }
            Some("") => errors.add("content", "The content field is required."),
            _ => {}
        }

        if let Some(Some(slug)) = &self.slug {
            check_length(&mut errors, "slug", slug);
            if !is_alpha_dash(slug) {
                errors.add(
                    "slug",
                    "The slug may only contain letters, numbers, dashes and underscores.",
                );
            }
        }

        if let Some(Some(minutes)) = self.reading_time {
            if !(1..=MAX_READING_TIME).contains(&minutes) {
                errors.add(
                    "reading_time",
                    format!("The reading time must be between 1 and {}.", MAX_READING_TIME),
                );
            }
        }

        if let Some(Some(meta_title)) = &self.meta_title {
            check_length(&mut errors, "meta_title", meta_title);
        }

        if let Some(Some(canonical)) = &self.canonical_url {
            check_length(&mut errors, "canonical_url", canonical);
            let valid = url::Url::parse(canonical)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
                .unwrap_or(false);
            if !valid {
                errors.add("canonical_url", "The canonical url must be a valid URL.");
            }
        }

        for slot in ImageSlot::ALL {
            if let ImageChange::Replace(upload) = self.image(slot) {
                if !upload.is_image() {
                    errors.add(slot.field(), format!("The {} must be an image.", slot.field()));
                }
                if upload.bytes.len() > MAX_IMAGE_BYTES {
                    errors.add(
                        slot.field(),
                        format!(
                            "The {} may not be greater than {} kilobytes.",
                            slot.field(),
                            MAX_IMAGE_BYTES / 1024
                        ),
                    );
                }
            }
        }

        errors
    }
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() > MAX_STRING_LEN {
        errors.add(
            field,
            format!("The {} may not be greater than {} characters.", field, MAX_STRING_LEN),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> PostInput {
        PostInput {
            title: Some("Hello".into()),
            content: Some("Body".into()),
            ..Default::default()
        }
    }

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png(len: usize) -> ImageUpload {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.resize(len.max(PNG_SIGNATURE.len()), 0);
        ImageUpload {
            file_name: "cover.PNG".into(),
            content_type: Some("image/png".into()),
            bytes,
        }
    }

    #[test]
    fn create_requires_title_and_content() {
        let errors = PostInput::default().validate(InputMode::Create);
        assert!(errors.contains("title"));
        assert!(errors.contains("content"));

        assert!(minimal().validate(InputMode::Create).is_empty());
    }

    #[test]
    fn update_accepts_an_empty_patch() {
        assert!(PostInput::default().validate(InputMode::Update).is_empty());
    }

    #[test]
    fn slug_must_be_alpha_dash() {
        let input = PostInput {
            slug: Some(Some("not a slug".into())),
            ..minimal()
        };
        assert!(input.validate(InputMode::Create).contains("slug"));

        let input = PostInput {
            slug: Some(None),
            ..minimal()
        };
        assert!(input.validate(InputMode::Create).is_empty());
    }

    #[test]
    fn reading_time_is_bounded() {
        for (minutes, ok) in [(0, false), (1, true), (1440, true), (1441, false)] {
            let input = PostInput {
                reading_time: Some(Some(minutes)),
                ..minimal()
            };
            assert_eq!(input.validate(InputMode::Create).is_empty(), ok, "{}", minutes);
        }
    }

    #[test]
    fn canonical_url_must_be_absolute_http() {
        let input = PostInput {
            canonical_url: Some(Some("ftp://example.com/x".into())),
            ..minimal()
        };
        assert!(input.validate(InputMode::Create).contains("canonical_url"));

        let input = PostInput {
            canonical_url: Some(Some("https://example.com/posts/hello".into())),
            ..minimal()
        };
        assert!(input.validate(InputMode::Create).is_empty());
    }

    #[test]
    fn images_must_be_small_images() {
        let input = PostInput {
            thumbnail: ImageChange::Replace(ImageUpload {
                bytes: b"%PDF-1.7 not a picture".to_vec(),
                ..png(10)
            }),
            og_image: ImageChange::Replace(png(MAX_IMAGE_BYTES + 1)),
            featured_image: ImageChange::Replace(png(10)),
            ..minimal()
        };
        let errors = input.validate(InputMode::Create);
        assert!(errors.contains("thumbnail"));
        assert!(errors.contains("og_image"));
        assert!(!errors.contains("featured_image"));
    }

    #[test]
    fn declared_image_type_is_not_trusted() {
        let script = ImageUpload {
            file_name: "avatar.png".into(),
            content_type: Some("image/png".into()),
            bytes: b"<?php system($_GET['c']); ?>".to_vec(),
        };
        assert!(!script.is_image());

        let input = PostInput {
            featured_image: ImageChange::Replace(script),
            ..minimal()
        };
        let errors = input.validate(InputMode::Create);
        assert_eq!(
            errors.get("featured_image"),
            Some(&["The featured_image must be an image.".to_string()][..])
        );
    }

    #[test]
    fn upload_extension_follows_the_content() {
        assert_eq!(png(16).extension(), "png");

        let renamed = ImageUpload {
            file_name: "shell.php".into(),
            content_type: None,
            ..png(16)
        };
        assert!(renamed.is_image());
        assert_eq!(renamed.extension(), "png");

        let unknown = ImageUpload {
            file_name: "noext".into(),
            content_type: None,
            bytes: vec![1, 2, 3],
        };
        assert_eq!(unknown.extension(), "bin");

        let named = ImageUpload {
            file_name: "Notes.TXT".into(),
            ..unknown
        };
        assert_eq!(named.extension(), "txt");
    }
}
