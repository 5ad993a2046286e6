//! Minimal, allocation-light HTML scanning.
//!
//! This is not a DOM: tags are found by scanning for `<`, attribute values are
//! entity-decoded, and element text runs until the first matching close tag.
//! That is enough for the handful of elements availability parsing needs.

use std::borrow::Cow;

/// Elements whose content never counts as visible page text.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased element name
    pub name: String,
    pub closing: bool,
    /// Byte offset of the opening `<`
    pub start: usize,
    /// Byte offset just past the closing `>`
    pub end: usize,
    attrs: Vec<(String, String)>,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    fn attr_is(&self, name: &str, expected: &str) -> bool {
        self.attr(name)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
    }
}

/// Iterator over the tags of a document, skipping comments and declarations.
pub struct Tags<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tags<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }
}

impl Iterator for Tags<'_> {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        loop {
            let start = self.pos + self.src.get(self.pos..)?.find('<')?;
            let rest = &self.src[start..];

            if rest.starts_with("<!--") {
                self.pos = rest.find("-->").map_or(self.src.len(), |e| start + e + 3);
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = rest.find('>').map_or(self.src.len(), |e| start + e + 1);
                continue;
            }

            let (closing, name_start) = if rest.as_bytes().get(1) == Some(&b'/') {
                (true, 2)
            } else {
                (false, 1)
            };
            if !rest
                .as_bytes()
                .get(name_start)
                .is_some_and(u8::is_ascii_alphabetic)
            {
                self.pos = start + 1;
                continue;
            }

            let Some(close) = find_tag_end(rest) else {
                self.pos = self.src.len();
                return None;
            };

            let inner = &rest[name_start..close];
            let name_len = inner
                .find(|c: char| c.is_ascii_whitespace() || c == '/')
                .unwrap_or(inner.len());
            let attrs = if closing {
                Vec::new()
            } else {
                parse_attrs(&inner[name_len..])
            };

            self.pos = start + close + 1;
            return Some(Tag {
                name: inner[..name_len].to_ascii_lowercase(),
                closing,
                start,
                end: self.pos,
                attrs,
            });
        }
    }
}

/// Position of the `>` ending the tag at the start of `s`, honoring quotes.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        if name_end == 0 {
            // stray '='
            rest = &rest[1..];
            continue;
        }
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                match after_eq.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let body = &after_eq[1..];
                        let close = body.find(q).unwrap_or(body.len());
                        rest = body.get(close + 1..).unwrap_or("");
                        &body[..close]
                    }
                    _ => {
                        let end = after_eq
                            .find(|c: char| c.is_ascii_whitespace())
                            .unwrap_or(after_eq.len());
                        rest = &after_eq[end..];
                        &after_eq[..end]
                    }
                }
            }
            None => "",
        };

        attrs.push((name, decode(value)));
    }

    attrs
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `s` without comments, declarations or processing instructions.
///
/// Same boundaries as [`Tags`]: an unterminated comment runs to the end.
fn without_comments(s: &str) -> Cow<'_, str> {
    if !s.contains("<!") && !s.contains("<?") {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('<') {
        let (before, at) = rest.split_at(i);
        out.push_str(before);

        let skip = if at.starts_with("<!--") {
            at.find("-->").map(|e| e + 3)
        } else if at.starts_with("<!") || at.starts_with("<?") {
            at.find('>').map(|e| e + 1)
        } else {
            out.push('<');
            rest = &at[1..];
            continue;
        };
        match skip {
            Some(len) => rest = &at[len..],
            None => return Cow::Owned(out),
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Remove tags from a fragment, decode entities and collapse whitespace.
pub fn strip_tags(s: &str) -> String {
    let s = without_comments(s);
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode(&out))
}

/// A borrowed HTML document with a lowercase shadow copy for case-insensitive search.
///
/// ASCII lowercasing keeps byte offsets identical between the two.
pub struct HtmlDoc<'a> {
    src: &'a str,
    lower: String,
}

impl<'a> HtmlDoc<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            lower: src.to_ascii_lowercase(),
        }
    }

    pub fn tags(&self) -> Tags<'a> {
        Tags::new(self.src)
    }

    pub fn has_markup(&self) -> bool {
        self.tags().next().is_some()
    }

    pub fn find_tag(&self, pred: impl Fn(&Tag) -> bool) -> Option<Tag> {
        self.tags().find(|tag| !tag.closing && pred(tag))
    }

    pub fn first(&self, name: &str) -> Option<Tag> {
        self.find_tag(|tag| tag.name == name)
    }

    /// First element whose `attr` equals `value`, case-insensitively.
    pub fn find_by_attr(&self, name: Option<&str>, attr: &str, value: &str) -> Option<Tag> {
        self.find_tag(|tag| name.map_or(true, |n| tag.name == n) && tag.attr_is(attr, value))
    }

    /// `content` of the first `<meta>` whose `property` or `name` is `key`.
    pub fn meta_content(&self, key: &str) -> Option<String> {
        self.find_tag(|tag| {
            tag.name == "meta" && (tag.attr_is("property", key) || tag.attr_is("name", key))
        })
        .and_then(|tag| tag.attr("content").map(|c| c.trim().to_string()))
    }

    /// Text content of an element up to its first matching close tag.
    pub fn text_of(&self, tag: &Tag) -> String {
        let close = format!("</{}", tag.name);
        match self.lower.get(tag.end..).and_then(|rest| rest.find(&close)) {
            Some(rel) => strip_tags(&self.src[tag.end..tag.end + rel]),
            None => String::new(),
        }
    }

    /// Lowercased text a visitor would see: no markup, no script or style content.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        let mut tags = self.tags();
        let mut prev = 0;

        while let Some(tag) = tags.next() {
            push_text(&mut out, &without_comments(&self.lower[prev..tag.start]));
            prev = tag.end;

            if !tag.closing && HIDDEN_ELEMENTS.contains(&tag.name.as_str()) {
                let close = format!("</{}", tag.name);
                let skip_to = self.lower[tag.end..]
                    .find(&close)
                    .map_or(self.lower.len(), |rel| tag.end + rel);
                tags.seek(skip_to);
                prev = skip_to;
            }
        }
        push_text(&mut out, &without_comments(&self.lower[prev..]));

        normalize_ws(&decode(&out)).to_lowercase()
    }
}

fn push_text(out: &mut String, text: &str) {
    if !text.trim().is_empty() {
        out.push_str(text);
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_attributes() {
        let doc = HtmlDoc::new(
            r#"<button class="btn" data-button-state='ADD_TO_CART' disabled type=submit>Go</button>"#,
        );
        let tag = doc.first("button").unwrap();
        assert_eq!(tag.attr("DATA-BUTTON-STATE"), Some("ADD_TO_CART"));
        assert_eq!(tag.attr("type"), Some("submit"));
        assert!(tag.has_attr("disabled"));
        assert!(!tag.has_attr("aria-disabled"));
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let doc = HtmlDoc::new(r#"<a title="a > b" href="/x">link</a>"#);
        let tag = doc.first("a").unwrap();
        assert_eq!(tag.attr("title"), Some("a > b"));
        assert_eq!(doc.text_of(&tag), "link");
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let doc = HtmlDoc::new("<!DOCTYPE html><!-- <h1>hidden</h1> --><h1>Shown</h1>");
        let h1 = doc.first("h1").unwrap();
        assert_eq!(doc.text_of(&h1), "Shown");
    }

    #[test]
    fn test_text_of_decodes_and_collapses() {
        let doc = HtmlDoc::new("<h1>\n  Laptop &amp; <b>Dock</b>\n</h1>");
        let h1 = doc.first("h1").unwrap();
        assert_eq!(doc.text_of(&h1), "Laptop & Dock");
    }

    #[test]
    fn test_meta_content_by_property_or_name() {
        let doc = HtmlDoc::new(
            r#"<meta property="og:title" content="Widget"><meta name="product:price:amount" content=" 9.99 ">"#,
        );
        assert_eq!(doc.meta_content("og:title").as_deref(), Some("Widget"));
        assert_eq!(doc.meta_content("product:price:amount").as_deref(), Some("9.99"));
        assert_eq!(doc.meta_content("missing"), None);
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let doc = HtmlDoc::new(
            "<body><p>Ship It</p><script>if (a<b) { label = 'sold out'; }</script>\
             <style>.x{}</style><P>Add&nbsp;to Cart</P></body>",
        );
        let text = doc.visible_text();
        assert!(text.contains("ship it"));
        assert!(!text.contains("sold out"));
        assert!(text.contains("to cart"));
    }

    #[test]
    fn test_visible_text_skips_comments() {
        let doc = HtmlDoc::new(
            "<!DOCTYPE html><h1>Widget</h1><!-- legacy banner: sold out -->\
             <?xml-stylesheet href=\"a.xsl\"?><p>Add to Cart</p><!-- unterminated",
        );
        assert_eq!(doc.visible_text(), "widget add to cart");
    }

    #[test]
    fn test_text_of_ignores_comment_with_gt() {
        let doc = HtmlDoc::new("<h1>Shown <!-- a > b --> Title</h1>");
        let h1 = doc.first("h1").unwrap();
        assert_eq!(doc.text_of(&h1), "Shown Title");
    }

    #[test]
    fn test_plain_text_has_no_markup() {
        assert!(!HtmlDoc::new("just words, 1 < 2").has_markup());
        assert!(HtmlDoc::new("<p>x</p>").has_markup());
    }
}
