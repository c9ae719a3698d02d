/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, <script>, <iframe>
/// and event-handler attributes are stripped along with their content.
/// Applied to every free-text field that is rendered back to students,
/// guardians or public quiz takers.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Same as [`clean_html`] for optional fields.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tags_are_removed() {
        let cleaned = clean_html("<b>Algebra</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>Algebra</b>");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("What is 2 + 2?"), "What is 2 + 2?");
        assert_eq!(clean_opt(None), None);
    }
}
