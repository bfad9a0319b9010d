//! URL slug derivation and unique allocation.

use std::future::Future;

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Numbered candidates tried before falling back to random suffixes.
pub const MAX_NUMBERED_CANDIDATES: u32 = 1000;

const RANDOM_TOKEN_LEN: usize = 8;

/// Turn free text into a lowercase, dash-separated ASCII slug.
///
/// Returns an empty string when nothing in the title maps to ASCII
/// letters or digits.
pub fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            '_' | '-' => cleaned.push('-'),
            '@' => cleaned.push_str("-at-"),
            c if c.is_whitespace() => cleaned.push(' '),
            c if c.is_ascii_alphanumeric() => cleaned.push(c.to_ascii_lowercase()),
            c => {
                if let Some(folded) = fold_latin(c) {
                    cleaned.push_str(folded);
                }
            }
        }
    }

    let mut slug = String::with_capacity(cleaned.len());
    let mut pending_separator = false;
    for ch in cleaned.chars() {
        if ch == '-' || ch == ' ' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !slug.is_empty() {
            slug.push('-');
        }
        pending_separator = false;
        slug.push(ch);
    }
    slug
}

/// Slug base for a title, or a random token when the title yields nothing.
pub fn base_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() { random_token() } else { slug }
}

pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// `true` when the value only uses letters, digits, dashes and underscores.
pub fn is_alpha_dash(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Candidate sequence for a base: `base`, `base-1`, `base-2`, ...
///
/// After [`MAX_NUMBERED_CANDIDATES`] numbered candidates it keeps yielding
/// `base-<random>` forever.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain((1..=MAX_NUMBERED_CANDIDATES).map(move |n| format!("{}-{}", base, n)))
        .chain(std::iter::repeat_with(move || format!("{}-{}", base, random_token())))
}

/// Allocate the first candidate for `title` that `exists` reports as free.
///
/// `exists` is the persistence lookup; it is expected to already exclude
/// soft-deleted posts and the post being updated.
pub async fn allocate<F, Fut, E>(title: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let base = base_slug(title);
    for candidate in candidates(&base) {
        if !exists(candidate.clone()).await? {
            tracing::debug!(slug = %candidate, "Allocated slug");
            return Ok(candidate);
        }
    }
    unreachable!("candidate sequence is infinite")
}

fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::convert::Infallible;

    async fn allocate_against(title: &str, taken: &HashSet<String>) -> String {
        allocate(title, |candidate| {
            let hit = taken.contains(&candidate);
            async move { Ok::<_, Infallible>(hit) }
        })
        .await
        .unwrap()
    }

    #[test]
    fn slugify_lowercases_and_joins_words() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust   in_Production -- 2024 "), "rust-in-production-2024");
        assert_eq!(slugify("Don't Panic"), "dont-panic");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("me@home"), "me-at-home");
    }

    #[test]
    fn slugify_drops_unmappable_text() {
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn empty_base_falls_back_to_random_token() {
        let base = base_slug("???");
        assert_eq!(base.len(), 8);
        assert!(base.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(base, base.to_lowercase());
    }

    #[test]
    fn alpha_dash_rules() {
        assert!(is_alpha_dash("hello-world_2"));
        assert!(!is_alpha_dash("hello world"));
        assert!(!is_alpha_dash("a/b"));
        assert!(!is_alpha_dash(""));
    }

    #[test]
    fn candidates_count_up_then_randomize() {
        let first: Vec<String> = candidates("post").take(3).collect();
        assert_eq!(first, vec!["post", "post-1", "post-2"]);

        let past_cap = candidates("post")
            .nth(MAX_NUMBERED_CANDIDATES as usize + 1)
            .unwrap();
        assert!(past_cap.starts_with("post-"));
        assert_eq!(past_cap.len(), "post-".len() + 8);
    }

    #[tokio::test]
    async fn second_identical_title_gets_numbered_suffix() {
        let mut taken = HashSet::new();
        let first = allocate_against("Hello, World!", &taken).await;
        assert_eq!(first, "hello-world");

        taken.insert(first);
        let second = allocate_against("Hello, World!", &taken).await;
        assert_eq!(second, "hello-world-1");
    }

    #[tokio::test]
    async fn allocated_slug_is_never_in_the_taken_set() {
        let taken: HashSet<String> = ["intro", "intro-1", "intro-2", "intro-4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let slug = allocate_against("Intro", &taken).await;
        assert_eq!(slug, "intro-3");
        assert!(!taken.contains(&slug));
    }

    #[tokio::test]
    async fn untitled_posts_get_a_non_empty_slug() {
        let slug = allocate_against("—", &HashSet::new()).await;
        assert!(!slug.is_empty());
    }

    #[tokio::test]
    async fn lookup_errors_propagate() {
        let result: Result<String, &str> = allocate("title", |_| async { Err("db down") }).await;
        assert_eq!(result, Err("db down"));
    }
}
