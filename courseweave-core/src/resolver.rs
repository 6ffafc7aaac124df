//! Pass 2: rewrite bracket tags into final markup.
//!
//! Lookups go against the symbol tables frozen after pass 1. Problems in a
//! single tag never abort the run: the tag degrades to a visible error span
//! and a diagnostic is recorded so the author can find it.

use crate::diagnostics::Diagnostics;
use crate::glossary::Bucket;
use crate::html::{error_span, escape, link};
use crate::media::UsedMedia;
use crate::models::{CourseTree, Location, PageLevel, GLOSSARY_DIR, MEDIA_DIR};
use crate::navigation::Navigation;
use crate::symbols::SymbolTables;
use crate::tags::{self, Node, Tag, TagName};
use base64::Engine;
use std::cell::RefCell;

/// Where the text being resolved will end up
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub level: PageLevel,
    /// Source of the text, used for diagnostics and step navigation
    pub location: Option<&'a Location>,
}

impl<'a> PageContext<'a> {
    pub fn step(location: &'a Location) -> Self {
        Self {
            level: PageLevel::Step,
            location: Some(location),
        }
    }
}

pub struct Resolver<'a> {
    tree: &'a CourseTree,
    tables: &'a SymbolTables,
    nav: &'a Navigation,
    /// Media named by converted tags, including those inside encoded popups
    media: RefCell<UsedMedia>,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a CourseTree, tables: &'a SymbolTables, nav: &'a Navigation) -> Self {
        Self {
            tree,
            tables,
            nav,
            media: RefCell::new(UsedMedia::new()),
        }
    }

    /// Media recorded so far; leaves the resolver's set empty
    pub fn take_media(&self) -> UsedMedia {
        self.media.take()
    }

    /// Resolve every tag in `body` in a single left-to-right pass
    pub fn resolve(&self, body: &str, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let mut out = String::with_capacity(body.len());
        for node in tags::parse(body) {
            match node {
                Node::Html(html) => out.push_str(html),
                Node::Tag(tag) => out.push_str(&self.convert(&tag, ctx, diags)),
            }
        }
        out
    }

    fn convert(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        match tag.name {
            TagName::Target => self.target(tag, ctx, diags),
            TagName::Link => self.anchor_link(tag, ctx, diags),
            TagName::Glossary => self.glossary_link(tag, ctx, diags),
            TagName::Img => self.image(tag, ctx, diags),
            TagName::Anim => self.animation(tag, ctx, diags),
            TagName::Applet => self.applet(tag, ctx, diags),
            TagName::Local => self.local_popup(tag, ctx, diags),
            TagName::Ref => self.citation(tag, ctx, diags),
            TagName::Clear => "<div class=\"clear\"></div>".to_string(),
            TagName::Prev | TagName::Next => self.step_button(tag.name, ctx),
        }
    }

    fn target(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        match tag.attr("name") {
            Some(name) => format!(r#"<a id="{0}" name="{0}" class="target"></a>"#, escape(name)),
            None => missing_attributes(tag, &["name"], ctx, diags),
        }
    }

    fn anchor_link(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(to) = tag.attr("to") else {
            return missing_attributes(tag, &["to"], ctx, diags);
        };
        let text = match tag.trimmed_body() {
            Some(body) => self.resolve(body, ctx, diags),
            None => escape(to),
        };

        match self.tables.anchors.get(to) {
            Some(target) => match self.tree.location_path(target) {
                Some(path) => {
                    let href = format!("{}{}#{}", ctx.level.prefix(), path, to);
                    link(&href, "anchor-link", &text)
                }
                None => {
                    diags.warn(
                        "link.excluded-target",
                        format!("Link to anchor '{}' which is only defined in excluded content ({})", to, target),
                        ctx.location,
                    );
                    format!("{} {}", error_span(&format!("[link target '{}' is not part of this build]", to)), text)
                }
            },
            None => {
                diags.error(
                    "link.unresolved",
                    format!("Unresolved link to anchor '{}'", to),
                    ctx.location,
                );
                format!("{} {}", error_span(&format!("[unresolved link: {}]", to)), text)
            }
        }
    }

    fn glossary_link(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(term) = tag.attr("term") else {
            return missing_attributes(tag, &["term"], ctx, diags);
        };
        let Some(entry) = self.tables.glossary.get(term) else {
            diags.error(
                "glossary.unknown",
                format!("Glossary term '{}' was not collected", term),
                ctx.location,
            );
            return error_span(&format!("[unknown glossary term: {}]", term));
        };

        let href = format!(
            "{}{}/{}.html#{}",
            ctx.level.prefix(),
            GLOSSARY_DIR,
            Bucket::for_term(&entry.term).file_stem(),
            entry.key
        );
        link(&href, "glossary", &escape(term))
    }

    fn image(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(name) = tag.attr("name") else {
            return missing_attributes(tag, &["name"], ctx, diags);
        };
        self.media.borrow_mut().record(name);

        let mut class = String::from("image");
        if let Some(kind) = tag.attr("type") {
            class.push(' ');
            class.push_str(&escape(kind));
        }
        if let Some(align) = tag.attr("align") {
            class.push_str(&format!(" align-{}", escape(align)));
        }

        let mut html = format!(
            r#"<img class="{}" src="{}{}/{}" alt="{}"{} />"#,
            class,
            ctx.level.prefix(),
            MEDIA_DIR,
            escape(name),
            escape(tag.attr("alt").unwrap_or_default()),
            dimensions(tag)
        );

        // Specialized images (typed ones) must describe themselves
        if let (Some(kind), None) = (tag.attr("type"), tag.attr("alt")) {
            diags.warn(
                "img.missing-alt",
                format!("Image '{}' of type '{}' has no alt text", name, kind),
                ctx.location,
            );
            html.push_str(&error_span(&format!("[missing alt text for image {}]", name)));
        }

        if let Some(caption) = tag.attr("caption") {
            html = format!(
                "<figure class=\"image\">{}<figcaption>{}</figcaption></figure>",
                html,
                escape(caption)
            );
        }
        html
    }

    fn animation(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let (Some(name), Some(width), Some(height)) =
            (tag.attr("name"), tag.attr("width"), tag.attr("height"))
        else {
            return missing_attributes(tag, &["name", "width", "height"], ctx, diags);
        };
        self.media.borrow_mut().record(name);
        format!(
            r#"<object class="animation" data="{}{}/{}" width="{}" height="{}"></object>"#,
            ctx.level.prefix(),
            MEDIA_DIR,
            escape(name),
            escape(width),
            escape(height)
        )
    }

    fn applet(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(name) = tag.attr("name") else {
            return missing_attributes(tag, &["name"], ctx, diags);
        };
        self.media.borrow_mut().record(name);
        format!(
            r#"<applet class="applet" archive="{}{}/{}" code="{}" width="{}" height="{}"></applet>"#,
            ctx.level.prefix(),
            MEDIA_DIR,
            escape(name),
            escape(tag.attr("code").unwrap_or(name)),
            escape(tag.attr("width").unwrap_or("400")),
            escape(tag.attr("height").unwrap_or("300"))
        )
    }

    fn local_popup(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(text) = tag.attr("text") else {
            return missing_attributes(tag, &["text"], ctx, diags);
        };
        let body = tag.body.unwrap_or_default();
        if body.trim().is_empty() {
            diags.warn(
                "local.empty",
                format!("Local popup '{}' has no body", text),
                ctx.location,
            );
        }
        // Tags inside the popup are converted first; the encoding only
        // protects the finished markup from later re-extraction
        let resolved = self.resolve(body, ctx, diags);
        let encoded = base64::engine::general_purpose::STANDARD.encode(resolved.as_bytes());
        format!(
            r##"<a class="local-popup" href="#" data-popup="{}" onclick="return showLocalPopup(this)">{}</a>"##,
            encoded,
            escape(text)
        )
    }

    fn citation(&self, tag: &Tag<'_>, ctx: PageContext<'_>, diags: &mut Diagnostics) -> String {
        let Some(key) = tag.attr("name") else {
            return missing_attributes(tag, &["name"], ctx, diags);
        };
        match self.tables.references.number(key) {
            Some(n) => link(
                &format!("{}references.html#ref-{}", ctx.level.prefix(), key),
                "ref",
                &format!("[{}]", n),
            ),
            None => {
                diags.warn(
                    "ref.uncited",
                    format!("Citation '{}' is not cited from any visible step", key),
                    ctx.location,
                );
                error_span(&format!("[citation {} unavailable]", key))
            }
        }
    }

    fn step_button(&self, name: TagName, ctx: PageContext<'_>) -> String {
        let Some(location) = ctx.location.filter(|_| ctx.level == PageLevel::Step) else {
            return String::new();
        };
        let Some(step) = location.step else {
            return String::new();
        };
        let buttons = self
            .nav
            .step_buttons(self.tree, &location.theme, &location.module, step);
        match name {
            TagName::Prev => buttons.render_prev(),
            _ => buttons.render_next(),
        }
    }
}

fn dimensions(tag: &Tag<'_>) -> String {
    let mut out = String::new();
    if let Some(width) = tag.attr("width") {
        out.push_str(&format!(r#" width="{}""#, escape(width)));
    }
    if let Some(height) = tag.attr("height") {
        out.push_str(&format!(r#" height="{}""#, escape(height)));
    }
    out
}

/// Report which of `required` are absent and render the inline marker
fn missing_attributes(
    tag: &Tag<'_>,
    required: &[&str],
    ctx: PageContext<'_>,
    diags: &mut Diagnostics,
) -> String {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| tag.attr(key).is_none())
        .collect();
    let message = format!(
        "[{}] tag is missing required attribute(s): {}",
        tag.name.as_str(),
        missing.join(", ")
    );
    diags.error("tag.missing-attribute", message.clone(), ctx.location);
    error_span(&message)
}
