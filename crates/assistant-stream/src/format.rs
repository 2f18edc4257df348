use once_cell::sync::Lazy;
use regex::Regex;

static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(.+?)__").expect("strong pattern should compile"));
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(.+?)_").expect("emphasis pattern should compile"));
static CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`(.+?)`").expect("code pattern should compile"));

/// Applies inline markup to one text fragment.
///
/// Substitutions run in a fixed order: newlines, `__strong__`, `_emphasis_`,
/// then `` `code` ``. Strong spans must be rewritten before emphasis so
/// `__x__` is not read as two emphasis delimiters.
pub fn format_inline(text: &str) -> String {
    let text = text.replace('\n', "<br/>");
    let text = STRONG.replace_all(&text, "<strong>$1</strong>");
    let text = EMPHASIS.replace_all(&text, "<em>$1</em>");
    CODE.replace_all(&text, "<code>$1</code>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_each_span_kind() {
        assert_eq!(format_inline("a__b__c"), "a<strong>b</strong>c");
        assert_eq!(format_inline("a_b_c"), "a<em>b</em>c");
        assert_eq!(format_inline("a`b`c"), "a<code>b</code>c");
    }

    #[test]
    fn strong_is_matched_before_emphasis() {
        assert_eq!(
            format_inline("__a__ _b_"),
            "<strong>a</strong> <em>b</em>"
        );
    }

    #[test]
    fn newlines_become_line_breaks() {
        assert_eq!(format_inline("Done.\n"), "Done.<br/>");
        assert_eq!(format_inline("a\n\nb"), "a<br/><br/>b");
    }

    #[test]
    fn spans_are_non_greedy_and_non_empty() {
        assert_eq!(format_inline("_a_ and _b_"), "<em>a</em> and <em>b</em>");
        assert_eq!(format_inline("``"), "``");
        assert_eq!(format_inline("snake_case"), "snake_case");
    }

    #[test]
    fn spans_do_not_cross_fragment_boundaries() {
        assert_eq!(format_inline("half _open"), "half _open");
    }
}
