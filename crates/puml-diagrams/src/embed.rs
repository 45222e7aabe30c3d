//! HTML embedding for rendered diagrams.
//!
//! Turns artifact bytes into a `<figure>` snippet:
//! - SVG is inlined, optionally with its inline sizing styles loosened
//! - PNG is inlined as a base64 data URI
//! - Failed diagrams become an error figure

use std::sync::LazyLock;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use regex::Regex;

use crate::block::DiagramFormat;

/// Class on the wrapping `<figure>`.
pub const FIGURE_CLASS: &str = "plantuml-diagram";
/// Class added to the root `<svg>` element.
pub const SVG_CLASS: &str = "plantuml-svg";
/// Class on `<img>` elements for raster diagrams.
pub const IMG_CLASS: &str = "plantuml-img";

/// Regex to match a `style="..."` attribute with its leading whitespace.
static STYLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s)style="([^"]*)""#).unwrap());

/// Regex to match `background*` declarations.
static BACKGROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbackground[^;]*;?").unwrap());

/// Regex to match `width:` declarations, excluding `stroke-width` and friends.
static WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[;\s])width:[^;]*;?").unwrap());

/// Regex to match `height:` declarations.
static HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[;\s])height:[^;]*;?").unwrap());

/// Regex to match the opening tag of the root `<svg>` element.
static SVG_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").unwrap());

/// Options controlling the generated markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Add `plantuml-*` classes to the figure and the embedded element.
    pub wrapper_classes: bool,
    /// Loosen inline sizing styles so the diagram can be styled with CSS.
    pub remove_inline_styles: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            wrapper_classes: true,
            remove_inline_styles: false,
        }
    }
}

/// Build the `<figure>` snippet for a rendered artifact.
///
/// SVG bytes that are not valid UTF-8 are decoded lossily.
#[must_use]
pub fn figure(bytes: &[u8], format: DiagramFormat, options: &EmbedOptions) -> String {
    let body = match format {
        DiagramFormat::Svg => svg_body(&String::from_utf8_lossy(bytes), options),
        DiagramFormat::Png => img_body(bytes, options),
    };
    format!("<figure{}>\n  {body}\n</figure>", figure_class(options))
}

/// Build the error figure shown in place of a failed diagram.
#[must_use]
pub fn error_figure(message: &str) -> String {
    format!(
        r#"<figure class="{FIGURE_CLASS} diagram-error"><pre>Diagram rendering failed: {}</pre></figure>"#,
        escape_html(message)
    )
}

/// Drop background declarations and replace fixed sizes in `style` attributes.
///
/// `width:` becomes `max-width:100%` and `height:` is removed. Attributes
/// left empty are dropped.
#[must_use]
pub fn remove_inline_styles(svg: &str) -> String {
    STYLE_ATTR_RE
        .replace_all(svg, |caps: &regex::Captures| {
            let style = BACKGROUND_RE.replace_all(&caps[2], "");
            let style = WIDTH_RE.replace_all(&style, "${1}max-width:100%;");
            let style = HEIGHT_RE.replace_all(&style, "${1}");
            let cleaned = collapse_separators(&style);
            if cleaned.is_empty() {
                String::new()
            } else {
                format!(r#"{}style="{cleaned}""#, &caps[1])
            }
        })
        .into_owned()
}

fn svg_body(svg: &str, options: &EmbedOptions) -> String {
    let svg = svg.trim();
    let svg = if options.remove_inline_styles {
        remove_inline_styles(svg)
    } else {
        svg.to_owned()
    };
    if options.wrapper_classes {
        add_svg_class(&svg)
    } else {
        svg
    }
}

fn img_body(bytes: &[u8], options: &EmbedOptions) -> String {
    let class = if options.wrapper_classes {
        format!(r#" class="{IMG_CLASS}""#)
    } else {
        String::new()
    };
    format!(
        r#"<img src="data:image/png;base64,{}" alt="PlantUML Diagram"{class} />"#,
        BASE64_STANDARD.encode(bytes)
    )
}

fn figure_class(options: &EmbedOptions) -> String {
    if options.wrapper_classes {
        format!(r#" class="{FIGURE_CLASS}""#)
    } else {
        String::new()
    }
}

/// Add [`SVG_CLASS`] to the root element unless it already carries a class.
fn add_svg_class(svg: &str) -> String {
    let Some(open) = SVG_OPEN_RE.find(svg) else {
        return svg.to_owned();
    };
    if open.as_str().contains(" class=") {
        return svg.to_owned();
    }
    let insert_at = open.start() + "<svg".len();
    format!(
        r#"{} class="{SVG_CLASS}"{}"#,
        &svg[..insert_at],
        &svg[insert_at..]
    )
}

fn collapse_separators(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
