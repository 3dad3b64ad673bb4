//! # Content Pipeline
//!
//! Turns raw user markup into the two stored forms of a post:
//!
//! ```text
//! raw markdown
//!     ↓ pulldown-cmark (links absolutized, code blocks highlighted)
//! rendered HTML
//!     ↓ ammonia allow-list (target="_blank", rel="noopener" on every link)
//! sanitized HTML ──→ stored as `content`
//!     ↓ strip every tag, decode entities
//! plain text     ──→ stored as `plain_text`, must not be blank
//! ```
//!
//! The pipeline is pure: persisting the result is the caller's job.

mod highlight;

use ammonia::Builder;
use domains::{DomainError, RenderedContent, Result};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

/// Keeps what the renderer emits (paragraphs, emphasis, links, lists, tables,
/// code with highlight classes) and drops anything script-capable.
static SANITIZER: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::default();
    builder
        .add_tag_attributes("code", &["class"])
        .add_tag_attributes("span", &["class"])
        .link_rel(Some("noopener"))
        .set_tag_attribute_value("a", "target", "_blank");
    builder
});

/// Allows no tags at all; used to pull the text content out of sanitized HTML.
static TEXT_EXTRACTOR: Lazy<Builder<'static>> = Lazy::new(Builder::empty);

/// Renders, sanitizes and validates post content.
///
/// `None` stands for a request that carried no content at all.
pub fn render_content(raw: Option<&str>) -> Result<RenderedContent> {
    let raw = raw.ok_or_else(|| DomainError::validation("content must be a string"))?;

    let rendered = render_markdown(raw);
    let html = SANITIZER.clean(&rendered).to_string();
    let plain_text = extract_text(&html);

    if plain_text.trim().is_empty() {
        return Err(DomainError::validation("Post content must not be empty"));
    }

    Ok(RenderedContent { html, plain_text })
}

fn render_markdown(raw: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut events = Vec::new();
    // (fence language, accumulated source) while inside a code block
    let mut code: Option<(Option<String>, String)> = None;

    for event in Parser::new_ext(raw, options) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, source)) = code.as_mut() {
                    source.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, source)) = code.take() {
                    let block = highlight::code_block(lang.as_deref(), &source);
                    events.push(Event::Html(CowStr::from(block)));
                }
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if link_type != LinkType::Email => {
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: absolutize(dest_url),
                    title,
                    id,
                }));
            }
            other => events.push(other),
        }
    }

    let mut html = String::with_capacity(raw.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

/// Prefixes `http://` to link targets without an explicit `scheme://`.
fn absolutize(dest: CowStr<'_>) -> CowStr<'_> {
    if has_scheme(&dest) {
        dest
    } else {
        CowStr::from(format!("http://{}", dest))
    }
}

/// RFC 3986 scheme: a letter, then letters, digits, `+`, `-` or `.`.
fn has_scheme(href: &str) -> bool {
    let Some((scheme, rest)) = href.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

fn extract_text(html: &str) -> String {
    let stripped = TEXT_EXTRACTOR.clean(html).to_string();
    html_escape::decode_html_entities(&stripped).into_owned()
}
