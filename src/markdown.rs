//! Markdown-subset renderer for assistant replies.
//!
//! Supports exactly three transforms, applied in order: bold (`**`/`__`),
//! italic (`*`/`_` when not adjacent to another marker of the same kind),
//! and literal newlines to `<br>`. The ordering matters: bold markers must
//! be fully consumed before the italic pass runs.
//!
//! Input is not escaped — markup-significant characters pass through
//! verbatim. The backend is trusted; user-authored text never reaches this
//! renderer.

use regex::Regex;
use std::sync::OnceLock;

fn re_bold_asterisk() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*(.+?)\*\*")
            .expect("re_bold_asterisk: pattern is valid and should always compile")
    })
}

fn re_bold_underscore() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"__(.+?)__")
            .expect("re_bold_underscore: pattern is valid and should always compile")
    })
}

fn re_italic_asterisk() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*([^*]+)\*")
            .expect("re_italic_asterisk: pattern is valid and should always compile")
    })
}

fn re_italic_underscore() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"_([^_]+)_")
            .expect("re_italic_underscore: pattern is valid and should always compile")
    })
}

/// Renders the constrained markdown subset to inline markup.
pub fn render(text: &str) -> String {
    let text = re_bold_asterisk().replace_all(text, "<strong>$1</strong>");
    let text = re_bold_underscore().replace_all(&text, "<strong>$1</strong>");
    let text = emphasize_unpaired(&text, re_italic_asterisk(), '*');
    let text = emphasize_unpaired(&text, re_italic_underscore(), '_');
    text.replace('\n', "<br>")
}

/// Wraps single-delimiter spans in `<em>`, skipping any match adjacent to
/// another occurrence of the same delimiter so leftover bold markers are
/// never misread as italics.
fn emphasize_unpaired(text: &str, re: &Regex, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let m = caps
            .get(0)
            .expect("capture 0 is always present after a match");
        if text[..m.start()].ends_with(delimiter) || text[m.end()..].starts_with(delimiter) {
            // Matches always start on the ASCII delimiter, so +1 stays on a
            // char boundary.
            pos = m.start() + 1;
            continue;
        }
        out.push_str(&text[copied..m.start()]);
        out.push_str("<em>");
        out.push_str(
            caps.get(1)
                .expect("single-delimiter pattern always captures group 1")
                .as_str(),
        );
        out.push_str("</em>");
        copied = m.end();
        pos = m.end();
    }
    out.push_str(&text[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::render;

    #[test]
    fn bold_then_italic() {
        assert_eq!(
            render("**hi** and *there*"),
            "<strong>hi</strong> and <em>there</em>"
        );
    }

    #[test]
    fn newline_becomes_br() {
        assert_eq!(render("a\nb"), "a<br>b");
    }

    #[test]
    fn bold_markers_are_consumed_before_the_italic_pass() {
        assert_eq!(render("**x**"), "<strong>x</strong>");
    }

    #[test]
    fn underscore_variants() {
        assert_eq!(render("__x__"), "<strong>x</strong>");
        assert_eq!(render("_x_"), "<em>x</em>");
    }

    #[test]
    fn italic_inside_a_sentence() {
        assert_eq!(render("um *voo* barato"), "um <em>voo</em> barato");
    }

    #[test]
    fn repeated_italics_on_one_line() {
        assert_eq!(render("*a* e *b*"), "<em>a</em> e <em>b</em>");
    }

    #[test]
    fn markers_adjacent_to_other_markers_are_left_alone() {
        assert_eq!(render("*a**b*"), "*a**b*");
        assert_eq!(render("a __b_"), "a __b_");
    }

    #[test]
    fn markup_characters_pass_through_unescaped() {
        assert_eq!(render("2 < 3 & <b>oi</b>"), "2 < 3 & <b>oi</b>");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(render("sem formatação"), "sem formatação");
    }
}
