//! HTML stripping and text normalization.
//!
//! Pure string processing, no I/O.

use std::sync::LazyLock;

use regex::Regex;

static INVISIBLE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<!--.*?-->")
        .expect("valid regex")
});

static LINE_BREAK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</?(p|div|tr|li|ul|ol|table|h[1-6]|section|article|blockquote|header|footer)\b[^>]*>",
    )
    .expect("valid regex")
});

static CELL_END_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").expect("valid regex"));

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C\u{00A0}\u{2009}\u{202F}]+").expect("valid regex"));

static CURRENCY_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([$€£¥]) +(\d)").expect("valid regex"));

static DECIMAL_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) +\. *(\d)").expect("valid regex"));

/// A comma only joins a thousands group: exactly three digits after it.
static THOUSANDS_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) +, *(\d{3})\b").expect("valid regex"));

/// Convert an HTML email body to plain text.
///
/// Drops `<head>`, `<script>`, `<style>` and comments, turns block tags into
/// line breaks, strips the remaining tags and decodes entities. The result is
/// not normalized; pass it through [`normalize_text`].
pub fn html_to_text(html: &str) -> String {
    let text = INVISIBLE_BLOCKS.replace_all(html, "");
    let text = LINE_BREAK_TAGS.replace_all(&text, "\n");
    let text = CELL_END_TAGS.replace_all(&text, " ");
    let text = ANY_TAG.replace_all(&text, "");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&euro;", "€")
        .replace("&pound;", "£")
        .replace("&amp;", "&")
}

/// Collapse whitespace and number-formatting artifacts.
///
/// - runs of spaces/tabs (including non-breaking and thin spaces) → one space
/// - lines trimmed, runs of blank lines → one blank line
/// - `$ 50` → `$50`
/// - `1 , 234 . 50` → `1,234.50`; `May 5 , 2024` and `3 , 4` are left alone
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = HORIZONTAL_WS.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        let line = CURRENCY_GAP.replace_all(line, "$1$2");
        let line = join_number_gaps(&line);
        lines.push(line);
    }

    // Trim trailing blank lines
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Matches can't overlap, so `1 , 234 , 567` needs a second pass.
fn join_number_gaps(line: &str) -> String {
    let mut line = line.to_string();
    loop {
        let joined = THOUSANDS_GAP.replace_all(&line, "$1,$2");
        let joined = DECIMAL_GAP.replace_all(&joined, "$1.$2").into_owned();
        if joined == line {
            return line;
        }
        line = joined;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_basic() {
        assert_eq!(normalize_text(&html_to_text("<p>Hello</p>")), "Hello");
    }

    #[test]
    fn html_nested_tags_and_attributes() {
        let html = r#"<div><b>Bold</b> and <a href="https://example.com">link</a></div>"#;
        assert_eq!(normalize_text(&html_to_text(html)), "Bold and link");
    }

    #[test]
    fn html_drops_script_style_and_comments() {
        let html = "<html><head><title>T</title><style>p{color:red}</style></head>\
                    <body><script>var x = '<p>';</script><!-- hidden -->Visible</body></html>";
        assert_eq!(normalize_text(&html_to_text(html)), "Visible");
    }

    #[test]
    fn html_block_tags_become_lines() {
        let html = "<p>Order shipped</p><p>Carrier: UPS<br>Tracking: 1Z</p>";
        assert_eq!(
            normalize_text(&html_to_text(html)),
            "Order shipped\n\nCarrier: UPS\nTracking: 1Z"
        );
    }

    #[test]
    fn html_table_cells_are_separated() {
        let html = "<table><tr><td>Total</td><td>$50</td></tr></table>";
        assert_eq!(normalize_text(&html_to_text(html)), "Total $50");
    }

    #[test]
    fn html_entities_decoded() {
        let html = "Tom &amp; Jerry&nbsp;&lt;3 &#8364;5 &#x41;";
        assert_eq!(normalize_text(&html_to_text(html)), "Tom & Jerry <3 €5 A");
    }

    #[test]
    fn html_double_escaped_amp_decodes_once() {
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_text("  Hello \t  World  \r\n\r\n\r\n\nNext\u{00A0}\u{00A0}line  \n\n"),
            "Hello World\n\nNext line"
        );
    }

    #[test]
    fn normalize_number_artifacts() {
        assert_eq!(
            normalize_text("Total: $ 1 , 234 . 50 due"),
            "Total: $1,234.50 due"
        );
        assert_eq!(normalize_text("€ 20"), "€20");
    }

    #[test]
    fn normalize_leaves_ordinary_text_alone() {
        let body = "Your invoice #123 total $50 due 2024-01-01";
        assert_eq!(normalize_text(body), body);
        assert_eq!(normalize_text("items 1, 2, 3"), "items 1, 2, 3");
    }

    #[test]
    fn normalize_keeps_comma_lists_and_dates() {
        let text = "Seats 3 , 4 and 5 on May 5 , 2024";
        assert_eq!(normalize_text(text), text);
        assert_eq!(normalize_text("rows 12 , 1234"), "rows 12 , 1234");
    }

    #[test]
    fn normalize_joins_every_thousands_group() {
        assert_eq!(normalize_text("$ 1 , 234 , 567 . 89"), "$1,234,567.89");
    }

    #[test]
    fn normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t\n "), "");
    }
}
