//! Syntax highlighting of fenced code blocks.
//!
//! Output uses CSS classes (`<span class="source rust">`) rather than inline
//! styles so the sanitizer only has to allow `class`. Any highlighting error
//! degrades to escaped, unhighlighted code.

use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Renders a complete `<pre><code>` block, newline-terminated.
pub fn code_block(lang: Option<&str>, code: &str) -> String {
    let class = lang
        .map(|lang| {
            format!(
                " class=\"language-{}\"",
                html_escape::encode_double_quoted_attribute(lang)
            )
        })
        .unwrap_or_default();

    let body = match highlight(lang, code) {
        Ok(Some(html)) => html,
        Ok(None) => html_escape::encode_text(code).into_owned(),
        Err(err) => {
            tracing::warn!(error = %err, lang = ?lang, "highlighting failed, emitting plain code");
            html_escape::encode_text(code).into_owned()
        }
    };

    format!("<pre><code{}>{}</code></pre>\n", class, body)
}

/// `Ok(None)` when no grammar matches the fence token or the first line.
fn highlight(lang: Option<&str>, code: &str) -> Result<Option<String>, syntect::Error> {
    let syntax = lang
        .and_then(|token| SYNTAXES.find_syntax_by_token(token))
        .or_else(|| SYNTAXES.find_syntax_by_first_line(code));
    let Some(syntax) = syntax else {
        return Ok(None);
    };

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(Some(generator.finalize()))
}
