//! Reading-time estimate for post bodies.

/// Average reading speed used for the estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Estimated minutes to read `content`; never less than one.
pub fn estimate(content: &str) -> i32 {
    let words = word_count(&strip_tags(content));
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Count runs of letters, apostrophes and hyphens.
pub fn word_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for ch in text.chars() {
        let is_word_char = ch.is_alphabetic() || ch == '\'' || ch == '-';
        if is_word_char && !in_word {
            count += 1;
        }
        in_word = is_word_char;
    }
    count
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_reads_in_one_minute() {
        assert_eq!(estimate(""), 1);
        assert_eq!(estimate("just a few words"), 1);
    }

    #[test]
    fn rounds_up_partial_minutes() {
        let body = "word ".repeat(201);
        assert_eq!(estimate(&body), 2);

        let body = "word ".repeat(400);
        assert_eq!(estimate(&body), 2);
    }

    #[test]
    fn markup_does_not_count_as_words() {
        assert_eq!(word_count(&strip_tags("<p class=\"lead\">Hello <b>world</b></p>")), 2);
    }

    #[test]
    fn digits_split_words() {
        assert_eq!(word_count("it's well-known since 2024"), 3);
    }
}
