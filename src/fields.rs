//! Validated request fields.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Deref;

pub const TITLE_MAX_LENGTH: usize = 100;

/// Transliterates `value` to ASCII, lowercases it and joins runs of letters
/// and digits with single hyphens. Everything else is dropped.
pub fn slugify(value: &str) -> String {
    let ascii = deunicode::deunicode(value);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_hyphen = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// URL path segment naming a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.is_empty() {
            return Err("length must be greater than 1".into());
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(
                "can only be made from lowercase letters, numeric digits, and hyphens".into(),
            );
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err("cannot start or end with a hyphen".into());
        }
        if value.contains("--") {
            return Err("cannot have more than one hyphen in a row".into());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Slug {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Post title. Always produces a non-empty slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title(String);

impl Title {
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("must not be empty".into());
        }
        if value.chars().count() > TITLE_MAX_LENGTH {
            return Err(format!(
                "must be at most {} characters long",
                TITLE_MAX_LENGTH
            ));
        }
        if slugify(value).is_empty() {
            return Err("must contain at least one letter or digit".into());
        }
        Ok(Self(value.to_string()))
    }

    pub fn slug(&self) -> Slug {
        Slug(slugify(&self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cleans user supplied HTML before it is stored.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

/// Tags kept by [`AllowlistSanitizer`].
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "strong", "ul",
    "h1", "h2", "h3", "p", "br", "u",
];

/// Keeps a small set of formatting tags and drops everything else.
///
/// Cleaning already cleaned output returns it unchanged, so content can be
/// loaded into the editor and saved again as is.
pub struct AllowlistSanitizer {
    builder: ammonia::Builder<'static>,
}

impl Default for AllowlistSanitizer {
    fn default() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .tags(ALLOWED_TAGS.iter().copied().collect())
            .generic_attributes(HashSet::new())
            .tag_attributes(HashMap::from([
                ("a", HashSet::from(["href", "title"])),
                ("abbr", HashSet::from(["title"])),
                ("acronym", HashSet::from(["title"])),
            ]));
        Self { builder }
    }
}

impl AllowlistSanitizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HtmlSanitizer for AllowlistSanitizer {
    fn sanitize(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

/// HTML that went through an [`HtmlSanitizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn new(raw: &str, sanitizer: &dyn HtmlSanitizer) -> Self {
        Self(sanitizer.sanitize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Test"), "test");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Rust   2021-- "), "rust-2021");
        assert_eq!(slugify("Crème brûlée"), "creme-brulee");
        assert_eq!(slugify("北京"), "bei-jing");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_rules() {
        assert!(Slug::parse("my-post-2").is_ok());
        assert!(Slug::parse("").is_err());
        assert!(Slug::parse("Upper").is_err());
        assert!(Slug::parse("-lead").is_err());
        assert!(Slug::parse("trail-").is_err());
        assert!(Slug::parse("dou--ble").is_err());
        assert!(Slug::parse("under_score").is_err());
    }

    #[test]
    fn test_slugify_output_is_valid_slug() {
        for title in ["Test", "A  b  c", "2024: a year", "x-y_z"] {
            let slug = slugify(title);
            assert!(Slug::parse(&slug).is_ok(), "{}", slug);
        }
    }

    #[test]
    fn test_title() {
        let title = Title::parse("  Hello World ").unwrap();
        assert_eq!(title.as_str(), "Hello World");
        assert_eq!(title.slug().as_str(), "hello-world");

        assert!(Title::parse("   ").is_err());
        assert!(Title::parse("???").is_err());
        assert!(Title::parse(&"a".repeat(TITLE_MAX_LENGTH + 1)).is_err());
        assert!(Title::parse(&"a".repeat(TITLE_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_non_ascii_title() {
        let title = Title::parse("你好").unwrap();
        assert_eq!(title.slug().as_str(), "ni-hao");
    }

    #[test]
    fn test_allowlist_sanitizer() {
        let sanitizer = AllowlistSanitizer::new();
        let clean = |raw: &str| SafeHtml::new(raw, &sanitizer).as_str().to_string();

        assert_eq!(clean("<script>alert('x')</script><p>ok</p>"), "<p>ok</p>");
        assert_eq!(clean("<h1 onclick=\"x()\">Title</h1>"), "<h1>Title</h1>");
        assert_eq!(clean("<div><u>under</u></div>"), "<u>under</u>");
        assert_eq!(clean("fish & chips"), "fish &amp; chips");
    }

    #[test]
    fn test_sanitizer_is_idempotent() {
        let sanitizer = AllowlistSanitizer::new();
        for raw in [
            "fish & chips",
            "<p>a &lt;b&gt; <strong>c</strong></p>",
            "<a href=\"https://example.com\" title=\"t\">link</a>",
            "<ul><li>one<li>two</ul><img src=x>",
        ] {
            let once = sanitizer.sanitize(raw);
            assert_eq!(sanitizer.sanitize(&once), once, "{}", raw);
        }
    }
}
