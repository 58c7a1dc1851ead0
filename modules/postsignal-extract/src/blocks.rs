// Locating post cards, either in a parsed document or in raw markup.

use scraper::{ElementRef, Html};

use crate::selectors::PostSelectors;

/// Outermost post-card containers in document order.
///
/// A card nested inside another card (reshares) belongs to its parent and is
/// not yielded on its own.
pub fn find_blocks<'a>(
    doc: &'a Html,
    selectors: &'a PostSelectors,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    doc.select(&selectors.post)
        .filter(move |el| !inside_post(el, selectors))
}

fn inside_post(el: &ElementRef<'_>, selectors: &PostSelectors) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| selectors.post.matches(&ancestor))
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Scan raw HTML for elements whose `class` contains `marker_class` and yield
/// each one's full outer markup.
///
/// This works on text, without building a tree. Nested tags with the same name
/// are counted so an inner closing tag does not end the block early. Comments
/// and `<script>`/`<style>` bodies are skipped. A block whose closing tag never
/// arrives is dropped. It is best-effort: badly broken markup can still fool it.
pub fn scan_blocks<'a>(html: &'a str, marker_class: &'a str) -> BlockScanner<'a> {
    BlockScanner {
        html,
        marker: marker_class,
        pos: 0,
    }
}

pub struct BlockScanner<'a> {
    html: &'a str,
    marker: &'a str,
    pos: usize,
}

impl<'a> Iterator for BlockScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while let Some(tag) = next_tag(self.html, self.pos) {
            self.pos = tag.end;

            let Tag::Open {
                name,
                attrs,
                self_closing,
            } = tag.kind
            else {
                continue;
            };

            if is_raw_text(name) {
                self.pos = skip_raw_text(self.html, tag.end, name);
                continue;
            }

            if !has_class(attrs, self.marker) {
                continue;
            }

            if self_closing || is_void(name) {
                return Some(&self.html[tag.start..tag.end]);
            }

            if let Some(end) = matching_close(self.html, tag.end, name) {
                self.pos = end;
                return Some(&self.html[tag.start..end]);
            }
        }
        self.pos = self.html.len();
        None
    }
}

struct ScannedTag<'a> {
    start: usize,
    end: usize,
    kind: Tag<'a>,
}

enum Tag<'a> {
    Open {
        name: &'a str,
        attrs: &'a str,
        self_closing: bool,
    },
    Close {
        name: &'a str,
    },
    /// Comments, doctypes, processing instructions, stray `<`.
    Other,
}

/// Find the next tag at or after `from`.
fn next_tag(html: &str, from: usize) -> Option<ScannedTag<'_>> {
    let start = from + html.get(from..)?.find('<')?;
    let rest = &html[start..];

    // A bare `<` in text is not a tag: step over it only.
    match rest.as_bytes().get(1) {
        Some(&b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {}
        _ => {
            return Some(ScannedTag {
                start,
                end: start + 1,
                kind: Tag::Other,
            })
        }
    }

    if rest.starts_with("<!--") {
        let end = rest
            .find("-->")
            .map(|i| start + i + 3)
            .unwrap_or(html.len());
        return Some(ScannedTag {
            start,
            end,
            kind: Tag::Other,
        });
    }

    let Some(close) = tag_end(rest) else {
        return Some(ScannedTag {
            start,
            end: html.len(),
            kind: Tag::Other,
        });
    };
    let end = start + close + 1;
    let inner = &html[start + 1..end - 1];

    let kind = if let Some(body) = inner.strip_prefix('/') {
        Tag::Close {
            name: tag_name(body),
        }
    } else {
        let name = tag_name(inner);
        if name.is_empty() {
            Tag::Other
        } else {
            Tag::Open {
                name,
                attrs: &inner[name.len()..],
                self_closing: inner.trim_end().ends_with('/'),
            }
        }
    };

    Some(ScannedTag { start, end, kind })
}

/// Offset of the `>` closing the tag that starts `rest`, ignoring `>` inside quotes.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in rest.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn tag_name(s: &str) -> &str {
    let len = s
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b':')
        .count();
    &s[..len]
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

fn skip_raw_text(html: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{}", name.to_ascii_lowercase());
    html[from..]
        .to_ascii_lowercase()
        .find(&needle)
        .map(|i| from + i)
        .unwrap_or(html.len())
}

/// Byte offset just past the tag closing the element opened before `from`.
fn matching_close(html: &str, from: usize, name: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = from;
    while let Some(tag) = next_tag(html, pos) {
        pos = tag.end;
        match tag.kind {
            Tag::Open {
                name: n,
                self_closing,
                ..
            } if n.eq_ignore_ascii_case(name) && !self_closing => depth += 1,
            Tag::Open { name: n, .. } if is_raw_text(n) => pos = skip_raw_text(html, pos, n),
            Tag::Close { name: n } if n.eq_ignore_ascii_case(name) => {
                depth -= 1;
                if depth == 0 {
                    return Some(tag.end);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether the attribute text contains a `class` attribute listing `marker`.
fn has_class(attrs: &str, marker: &str) -> bool {
    attribute(attrs, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == marker))
        .unwrap_or(false)
}

/// Value of attribute `wanted` in a raw attribute string.
pub(crate) fn attribute<'a>(attrs: &'a str, wanted: &str) -> Option<&'a str> {
    let bytes = attrs.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/')
        {
            i += 1;
        }
        let name = &attrs[name_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = "";
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let q = bytes[i];
                let v_start = i + 1;
                let v_end = attrs[v_start..]
                    .bytes()
                    .position(|b| b == q)
                    .map(|p| v_start + p)
                    .unwrap_or(attrs.len());
                value = &attrs[v_start..v_end];
                i = (v_end + 1).min(attrs.len());
            } else {
                let v_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &attrs[v_start..i];
            }
        }
        if name.eq_ignore_ascii_case(wanted) {
            return Some(value);
        }
        if name.is_empty() {
            i += attrs[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsignal_common::SiteProfile;

    const MARKER: &str = "feed-shared-update-v2";

    #[test]
    fn scan_handles_nested_divs() {
        let html = r#"<main><div class="feed-shared-update-v2 artdeco-card" data-urn="urn:li:activity:1">
            <div class="inner"><div>deep</div></div><span>tail</span>
        </div><div class="other">x</div></main>"#;
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("<div class=\"feed-shared-update-v2"));
        assert!(blocks[0].ends_with("</span>\n        </div>"));
        assert!(blocks[0].contains("deep"));
        assert!(!blocks[0].contains("other"));
    }

    #[test]
    fn scan_yields_siblings_in_order() {
        let html = r#"<div class="feed-shared-update-v2" id="a"><p>1</p></div>
                      <DIV CLASS='feed-shared-update-v2' id="b"><p>2</p></DIV>"#;
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains(r#"id="a""#));
        assert!(blocks[1].contains(r#"id="b""#));
    }

    #[test]
    fn scan_requires_whole_class_token() {
        let html = r#"<div class="feed-shared-update-v2__description">no</div>"#;
        assert_eq!(scan_blocks(html, MARKER).count(), 0);
    }

    #[test]
    fn scan_ignores_comments_and_scripts() {
        let html = r#"<div class="feed-shared-update-v2"><!-- </div> -->
            <script>var s = "</div>";</script><p>body</p></div>"#;
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].ends_with("<p>body</p></div>"));
    }

    #[test]
    fn scan_treats_outer_card_as_one_block() {
        let html = r#"<div class="feed-shared-update-v2" id="outer">
            <div class="feed-shared-update-v2" id="inner">reshare</div>
        </div>"#;
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("outer") && blocks[0].contains("inner"));
    }

    #[test]
    fn scan_drops_unterminated_block() {
        let html = r#"<div class="feed-shared-update-v2"><div>never closed"#;
        assert_eq!(scan_blocks(html, MARKER).count(), 0);
    }

    #[test]
    fn scan_tolerates_gt_in_attribute_values() {
        let html = r#"<div class="feed-shared-update-v2" aria-label="a > b"><i>x</i></div>"#;
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks, vec![html]);
    }

    #[test]
    fn scan_steps_over_multibyte_text_after_nameless_attribute() {
        let html = "<div =\"x\"é class=\"feed-shared-update-v2\"><p>a</p></div>";
        let blocks: Vec<_> = scan_blocks(html, MARKER).collect();
        assert_eq!(blocks, vec![html]);
        assert_eq!(attribute(" =\"x\"é class=\"c\"", "class"), Some("c"));
        assert_eq!(attribute(" =ü", "class"), None);
    }

    #[test]
    fn scan_empty_input() {
        assert_eq!(scan_blocks("", MARKER).count(), 0);
        assert_eq!(scan_blocks("plain text < 3", MARKER).count(), 0);
    }

    #[test]
    fn attribute_lookup() {
        let attrs = r#" class="a b" data-urn='urn:li:activity:9' hidden id=x"#;
        assert_eq!(attribute(attrs, "class"), Some("a b"));
        assert_eq!(attribute(attrs, "data-urn"), Some("urn:li:activity:9"));
        assert_eq!(attribute(attrs, "hidden"), Some(""));
        assert_eq!(attribute(attrs, "id"), Some("x"));
        assert_eq!(attribute(attrs, "missing"), None);
    }

    #[test]
    fn find_blocks_skips_nested_cards() {
        let selectors = PostSelectors::new(SiteProfile::default()).unwrap();
        let doc = Html::parse_document(
            r#"<div class="feed-shared-update-v2" id="a">
                 <div class="feed-shared-update-v2" id="nested"></div>
               </div>
               <div class="feed-shared-update-v2" id="b"></div>"#,
        );
        let ids: Vec<_> = find_blocks(&doc, &selectors)
            .filter_map(|el| el.value().attr("id"))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn find_blocks_empty_document() {
        let selectors = PostSelectors::new(SiteProfile::default()).unwrap();
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        assert_eq!(find_blocks(&doc, &selectors).count(), 0);
    }
}
