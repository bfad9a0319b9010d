//! Request decoding: JSON or multipart bodies into `PostInput`, query
//! strings into `PostQuery`.
//!
//! Strings are trimmed and blank strings count as null, for both body kinds.

use std::collections::HashMap;

use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{HttpRequest, http::header, web};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use uuid::Uuid;

use quill_core::domain::{
    ImageChange, ImageSlot, ImageUpload, MAX_IMAGE_BYTES, PostInput, PostQuery, PostStatus,
    ScheduleInput,
};
use quill_core::error::FieldErrors;

use crate::middleware::error::AppError;

/// Upper bound for a JSON body or a single multipart text field.
const MAX_TEXT_BYTES: usize = 1024 * 1024;

/// Undecoded payload: text values by key plus uploaded files.
#[derive(Debug, Default)]
pub struct RawPayload {
    fields: Map<String, Value>,
    files: HashMap<String, ImageUpload>,
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart body: {}", e))
}

/// `tags[]` and `tags[3]` both name the `tags` array.
fn array_base(name: &str) -> Option<&str> {
    let (base, rest) = name.split_once('[')?;
    (!base.is_empty() && rest.ends_with(']')).then_some(base)
}

fn label(key: &str) -> String {
    key.replace('_', " ")
}

async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if body.len() + chunk.len() > MAX_TEXT_BYTES {
            return Err(AppError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Read a multipart field, keeping at most `cap` bytes. The flag reports
/// whether anything was cut off.
async fn read_field(field: &mut Field, cap: usize) -> Result<(Vec<u8>, bool), AppError> {
    let mut bytes = Vec::new();
    let mut overflow = false;
    while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
        let room = cap.saturating_sub(bytes.len());
        if chunk.len() > room {
            overflow = true;
            bytes.extend_from_slice(&chunk[..room]);
        } else {
            bytes.extend_from_slice(&chunk);
        }
    }
    Ok((bytes, overflow))
}

impl RawPayload {
    /// Decode the body according to its content type. Anything that is not
    /// `multipart/form-data` is read as JSON; an empty body is an empty object.
    pub async fn extract(req: &HttpRequest, payload: web::Payload) -> Result<Self, AppError> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        if is_multipart {
            return Self::from_multipart(Multipart::new(req.headers(), payload)).await;
        }

        let body = read_body(payload).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {}", e)))?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                files: HashMap::new(),
            }),
            _ => Err(AppError::BadRequest(
                "The request body must be a JSON object.".to_string(),
            )),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut raw = Self::default();

        while let Some(mut field) = multipart.try_next().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(String::from);

            match file_name {
                Some(file_name) => {
                    let content_type = field.content_type().map(|m| m.essence_str().to_string());
                    // One byte past the limit is enough for validation to reject it.
                    let (bytes, _) = read_field(&mut field, MAX_IMAGE_BYTES + 1).await?;
                    raw.insert_file(name, file_name, content_type, bytes);
                }
                None => {
                    let (bytes, overflow) = read_field(&mut field, MAX_TEXT_BYTES).await?;
                    if overflow {
                        return Err(AppError::PayloadTooLarge);
                    }
                    let text = String::from_utf8(bytes).map_err(|_| {
                        AppError::BadRequest(format!("The {} field is not valid UTF-8.", name))
                    })?;
                    raw.insert_text(&name, text);
                }
            }
        }

        Ok(raw)
    }

    fn insert_text(&mut self, name: &str, text: String) {
        let Some(base) = array_base(name) else {
            self.fields.insert(name.to_string(), Value::String(text));
            return;
        };

        let slot = self
            .fields
            .entry(base.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(Value::String(text)),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, Value::String(text)]);
            }
        }
    }

    fn insert_file(
        &mut self,
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) {
        // Browsers send an empty part for an untouched file input.
        if file_name.is_empty() && bytes.is_empty() {
            self.fields.insert(name, Value::Null);
            return;
        }

        let content_type = content_type
            .filter(|ct| ct != "application/octet-stream")
            .or_else(|| {
                mime_guess::from_path(&file_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            });

        self.files.insert(
            name,
            ImageUpload {
                file_name,
                content_type,
                bytes,
            },
        );
    }

    /// Type-check every known field. Unknown keys are ignored.
    pub fn into_input(mut self) -> Result<PostInput, FieldErrors> {
        let mut reader = Reader {
            fields: &self.fields,
            errors: FieldErrors::new(),
        };

        let mut input = PostInput {
            title: reader.text("title"),
            slug: reader.nullable_text("slug"),
            excerpt: reader.nullable_text("excerpt"),
            content: reader.text("content"),
            reading_time: reader.nullable_int("reading_time"),
            schedule: ScheduleInput {
                status: reader.status("status"),
                published_at: reader.nullable_date("published_at"),
                scheduled_at: reader.nullable_date("scheduled_at"),
            },
            meta_title: reader.nullable_text("meta_title"),
            meta_description: reader.nullable_text("meta_description"),
            canonical_url: reader.nullable_text("canonical_url"),
            category_id: reader.nullable_reference("category_id"),
            tags: reader.references("tags"),
            allow_comments: reader.boolean("allow_comments"),
            ..Default::default()
        };

        for slot in ImageSlot::ALL {
            let key = slot.field();
            let change = match self.files.remove(key) {
                Some(upload) => ImageChange::Replace(upload),
                None => reader.image(key),
            };
            match slot {
                ImageSlot::Featured => input.featured_image = change,
                ImageSlot::Thumbnail => input.thumbnail = change,
                ImageSlot::OpenGraph => input.og_image = change,
            }
        }

        if reader.errors.is_empty() {
            Ok(input)
        } else {
            Err(reader.errors)
        }
    }
}

/// Reads typed values out of the raw map, collecting type errors.
struct Reader<'a> {
    fields: &'a Map<String, Value>,
    errors: FieldErrors,
}

/// Trimmed text, with blank strings folded into null.
fn blank_to_null(value: &Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

impl Reader<'_> {
    fn get(&self, key: &str) -> Option<Value> {
        self.fields.get(key).map(blank_to_null)
    }

    /// Non-nullable text. Null and blank come back as `""` so the
    /// required-field rules report them.
    fn text(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => Some(String::new()),
            Value::String(s) => Some(s),
            _ => {
                self.errors
                    .add(key, format!("The {} field must be a string.", label(key)));
                None
            }
        }
    }

    fn nullable_text(&mut self, key: &str) -> Option<Option<String>> {
        match self.get(key)? {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s)),
            _ => {
                self.errors
                    .add(key, format!("The {} field must be a string.", label(key)));
                None
            }
        }
    }

    fn nullable_int(&mut self, key: &str) -> Option<Option<i32>> {
        let parsed = match self.get(key)? {
            Value::Null => return Some(None),
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.parse::<i32>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) => Some(Some(n)),
            None => {
                self.errors
                    .add(key, format!("The {} field must be an integer.", label(key)));
                None
            }
        }
    }

    fn status(&mut self, key: &str) -> Option<PostStatus> {
        let value = self.get(key)?;
        match value.as_str().and_then(|s| s.parse::<PostStatus>().ok()) {
            Some(status) => Some(status),
            None => {
                self.errors
                    .add(key, format!("The selected {} is invalid.", label(key)));
                None
            }
        }
    }

    fn nullable_date(&mut self, key: &str) -> Option<Option<DateTime<Utc>>> {
        let value = self.get(key)?;
        if value.is_null() {
            return Some(None);
        }
        match value.as_str().and_then(parse_datetime) {
            Some(at) => Some(Some(at)),
            None => {
                self.errors.add(
                    key,
                    format!("The {} field must be a valid date.", label(key)),
                );
                None
            }
        }
    }

    fn nullable_reference(&mut self, key: &str) -> Option<Option<Uuid>> {
        let value = self.get(key)?;
        if value.is_null() {
            return Some(None);
        }
        match value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
            Some(id) => Some(Some(id)),
            None => {
                self.errors
                    .add(key, format!("The selected {} is invalid.", label(key)));
                None
            }
        }
    }

    /// A list of ids. Null clears the list; a single string is a list of one.
    fn references(&mut self, key: &str) -> Option<Vec<Uuid>> {
        let items = match self.get(key)? {
            Value::Null => return Some(Vec::new()),
            Value::Array(items) => items,
            single @ Value::String(_) => vec![single],
            _ => {
                self.errors
                    .add(key, format!("The {} field must be an array.", label(key)));
                return None;
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for (index, item) in items.iter().map(blank_to_null).enumerate() {
            match item.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                Some(id) => ids.push(id),
                None => {
                    let field = format!("{}.{}", key, index);
                    self.errors
                        .add(field.clone(), format!("The selected {} is invalid.", field));
                }
            }
        }
        Some(ids)
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        let parsed = match self.get(key)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(
                key,
                format!("The {} field must be true or false.", label(key)),
            );
        }
        parsed
    }

    /// Image slots without an uploaded file: null removes, anything else is
    /// not an image.
    fn image(&mut self, key: &str) -> ImageChange {
        match self.get(key) {
            None => ImageChange::Keep,
            Some(Value::Null) => ImageChange::Remove,
            Some(_) => {
                self.errors.add(key, format!("The {} must be an image.", key));
                ImageChange::Keep
            }
        }
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Listing filters from the query string. Unparseable ids and numbers are
/// dropped rather than rejected.
pub fn post_query(query_string: &str) -> PostQuery {
    let mut query = PostQuery::default();

    for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
        let value = value.trim();
        let present = (!value.is_empty()).then(|| value.to_string());

        match key.as_ref() {
            "status" => query.status = present,
            "search" => query.search = present,
            "author_id" => query.author_id = Uuid::parse_str(value).ok(),
            "category_id" => query.category_id = Uuid::parse_str(value).ok(),
            "page" => query.page = value.parse().ok(),
            "per_page" => query.per_page = value.parse().ok(),
            name if name == "tags" || array_base(name) == Some("tags") => query.tag_ids.extend(
                value
                    .split(',')
                    .filter_map(|id| Uuid::parse_str(id.trim()).ok()),
            ),
            _ => {}
        }
    }

    query
}
