use scraper::Html;

use super::Hooks;
use crate::models::FeedItem;

/// Render one day's items as the post body:
/// before-hook, the `<ul>` list, after-hook, then the whole-content hook.
pub fn render_list(items: &[FeedItem], list_class: &str, hooks: &Hooks) -> String {
    let class = hooks.apply_list_class(list_class.to_string());

    let mut content = hooks.apply_before_content();
    content.push_str(&format!("<ul class=\"{}\">", class));

    for item in items {
        content.push_str("<li>");
        content.push_str(&format!(
            "<a href=\"{}\">{}</a> {}",
            item.permalink,
            item.title,
            describe(item.description.as_deref())
        ));
        content.push_str("</li>");
    }
    content.push_str("</ul>");

    content.push_str(&hooks.apply_after_content());

    hooks.apply_post_content(content)
}

/// `(description)` with HTML entities decoded, or nothing.
fn describe(description: Option<&str>) -> String {
    match description {
        Some(text) if !text.is_empty() => format!("({})", decode_entities(text)),
        _ => String::new(),
    }
}

const MAX_ENTITY_LEN: usize = 32;

/// Decode each `&...;` reference on its own so a stray `&` or an unknown
/// entity stays as written without blocking the rest.
fn decode_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        rest = &rest[start..];

        let reference = rest[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .filter(|&end| end < MAX_ENTITY_LEN && rest[1 + end..].starts_with(';'))
            .map(|end| &rest[..end + 2]);

        match reference.map(|r| (r, htmlescape::decode_html(r))) {
            Some((reference, Ok(ch))) => {
                decoded.push_str(&ch);
                rest = &rest[reference.len()..];
            }
            _ => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

/// Plain text of an HTML fragment; `script` and `style` bodies are dropped.
pub fn strip_tags(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);

    let text: String = fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                .is_some_and(|name| name == "script" || name == "style");
            (!hidden).then_some(&**text)
        })
        .collect();

    // Text nodes come back decoded; keep escaped markup escaped.
    escape_text(text.trim())
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
