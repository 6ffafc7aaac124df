//! Small HTML helpers shared by the resolver and page emitters.

/// HTML escape function for text and attribute values
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Undo [`escape`] and the other common named or numeric entities
pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Inline marker for a recoverable authoring defect
pub fn error_span(message: &str) -> String {
    format!(r#"<span class="error">{}</span>"#, escape(message))
}

/// `<a>` element with an escaped href and pre-rendered inner HTML
pub fn link(href: &str, class: &str, inner_html: &str) -> String {
    format!(
        r#"<a class="{}" href="{}">{}</a>"#,
        class,
        escape(href),
        inner_html
    )
}
