//! Alphabetical glossary pages with back-links to every visible use.

use crate::builder::BuildError;
use crate::diagnostics::Diagnostics;
use crate::html::{escape, link};
use crate::models::{CourseTree, PageLevel, GLOSSARY_DIR};
use crate::resolver::{PageContext, Resolver};
use crate::symbols::{GlossaryEntry, GlossaryTable};
use crate::template_vars;
use crate::writer::PageWriter;
use std::collections::BTreeMap;

/// Glossary page a term is listed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Letter(char),
    Digit,
    Symbol,
}

impl Bucket {
    /// Bucket chosen by the first character of the term
    pub fn for_term(term: &str) -> Self {
        match term.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some(c) if c.is_ascii_lowercase() => Bucket::Letter(c),
            Some(c) if c.is_ascii_digit() => Bucket::Digit,
            _ => Bucket::Symbol,
        }
    }

    pub fn file_stem(&self) -> String {
        match self {
            Bucket::Letter(c) => c.to_string(),
            Bucket::Digit => "digit".to_string(),
            Bucket::Symbol => "symb".to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Bucket::Letter(c) => c.to_ascii_uppercase().to_string(),
            Bucket::Digit => "0-9".to_string(),
            Bucket::Symbol => "Symbols".to_string(),
        }
    }

    /// `a` to `z`, then digits, then symbols
    pub fn all() -> Vec<Bucket> {
        ('a'..='z')
            .map(Bucket::Letter)
            .chain([Bucket::Digit, Bucket::Symbol])
            .collect()
    }
}

/// Group the terms that survived filtering; terms with no visible use are dropped
pub fn bucket_terms(table: &GlossaryTable) -> BTreeMap<Bucket, Vec<&GlossaryEntry>> {
    let mut buckets: BTreeMap<Bucket, Vec<&GlossaryEntry>> = BTreeMap::new();
    for entry in table.entries().filter(|e| !e.references.is_empty()) {
        buckets
            .entry(Bucket::for_term(&entry.term))
            .or_default()
            .push(entry);
    }
    buckets
}

/// Write one page per non-empty bucket plus the glossary index.
///
/// Returns the number of terms listed.
pub fn emit_glossary(
    table: &GlossaryTable,
    tree: &CourseTree,
    resolver: &Resolver<'_>,
    writer: &mut PageWriter<'_>,
    diags: &mut Diagnostics,
) -> Result<usize, BuildError> {
    let buckets = bucket_terms(table);
    let letter_bar = render_letter_bar(&buckets);
    let mut listed = 0;

    for (bucket, entries) in &buckets {
        let mut html = String::from("<dl class=\"glossary\">\n");
        for entry in entries {
            html.push_str(&render_entry(entry, tree, resolver, diags));
            listed += 1;
        }
        html.push_str("</dl>");

        writer.render_page(
            "glossary_page",
            &format!("{}/{}.html", GLOSSARY_DIR, bucket.file_stem()),
            PageLevel::Theme,
            template_vars! {
                "title" => format!("Glossary: {}", bucket.label()),
                "letter" => bucket.label(),
                "letter_bar" => letter_bar.clone(),
                "entries" => html,
            },
        )?;
    }

    writer.render_page(
        "glossary_index",
        &format!("{}/index.html", GLOSSARY_DIR),
        PageLevel::Theme,
        template_vars! {
            "title" => "Glossary",
            "letter_bar" => letter_bar,
            "term_count" => listed,
        },
    )?;

    tracing::info!("Glossary: {} terms on {} pages", listed, buckets.len());
    Ok(listed)
}

/// Resolve every listed definition without writing pages, collecting the
/// same diagnostics a build would. Returns the number of terms listed.
pub fn check_definitions(
    table: &GlossaryTable,
    resolver: &Resolver<'_>,
    diags: &mut Diagnostics,
) -> usize {
    let mut listed = 0;
    for entries in bucket_terms(table).values() {
        for entry in entries {
            render_definition(entry, resolver, diags);
            listed += 1;
        }
    }
    listed
}

/// Definition markup as it appears on a glossary page
fn render_definition(
    entry: &GlossaryEntry,
    resolver: &Resolver<'_>,
    diags: &mut Diagnostics,
) -> String {
    match &entry.definition {
        Some(body) => {
            let ctx = PageContext {
                level: PageLevel::Theme,
                location: entry.defined_at.as_ref(),
            };
            resolver.resolve(body, ctx, diags)
        }
        None => {
            diags.warn(
                "glossary.undefined",
                format!("Glossary term '{}' is used but never defined", entry.term),
                entry.references.first(),
            );
            "<em>No definition available.</em>".to_string()
        }
    }
}

fn render_entry(
    entry: &GlossaryEntry,
    tree: &CourseTree,
    resolver: &Resolver<'_>,
    diags: &mut Diagnostics,
) -> String {
    let definition = render_definition(entry, resolver, diags);

    let backlinks: Vec<String> = entry
        .references
        .iter()
        .filter_map(|loc| tree.location_path(loc))
        .enumerate()
        .map(|(i, path)| {
            link(
                &format!("{}{}", PageLevel::Theme.prefix(), path),
                "backlink",
                &(i + 1).to_string(),
            )
        })
        .collect();

    format!(
        "<dt id=\"{}\">{}</dt>\n<dd>\n<div class=\"definition\">{}</div>\n<p class=\"backlinks\">Used in: {}</p>\n</dd>\n",
        escape(&entry.key),
        escape(&entry.term),
        definition,
        backlinks.join(", ")
    )
}

/// Links to every non-empty bucket, disabled markers for the rest
fn render_letter_bar(buckets: &BTreeMap<Bucket, Vec<&GlossaryEntry>>) -> String {
    let items: Vec<String> = Bucket::all()
        .into_iter()
        .map(|bucket| {
            if buckets.contains_key(&bucket) {
                format!(
                    "<a class=\"letter\" href=\"{}.html\">{}</a>",
                    bucket.file_stem(),
                    bucket.label()
                )
            } else {
                format!("<span class=\"letter disabled\">{}</span>", bucket.label())
            }
        })
        .collect();
    format!("<nav class=\"glossary-letters\">{}</nav>", items.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    #[test]
    fn test_bucket_selection() {
        assert_eq!(Bucket::for_term("Heap"), Bucket::Letter('h'));
        assert_eq!(Bucket::for_term("  zero-cost"), Bucket::Letter('z'));
        assert_eq!(Bucket::for_term("3D"), Bucket::Digit);
        assert_eq!(Bucket::for_term("#[derive]"), Bucket::Symbol);
        assert_eq!(Bucket::for_term("Éclair"), Bucket::Symbol);
        assert_eq!(Bucket::Digit.file_stem(), "digit");
        assert_eq!(Bucket::Symbol.file_stem(), "symb");
        assert_eq!(Bucket::all().len(), 28);
    }

    #[test]
    fn test_terms_without_visible_references_are_omitted() {
        let visible = Location::new("t", "m", "step1.html", Some(1));
        let hidden = Location::new("t", "m", "step2.html", None);
        let mut table = GlossaryTable::new();
        table.record("heap", Some("Dynamic memory."), &hidden, false).unwrap();
        table.record("stack", Some("Frames."), &visible, true).unwrap();
        table.record("Slice", None, &visible, true).unwrap();

        let buckets = bucket_terms(&table);
        assert_eq!(buckets.len(), 1);
        let terms: Vec<&str> = buckets[&Bucket::Letter('s')]
            .iter()
            .map(|e| e.term.as_str())
            .collect();
        assert_eq!(terms, vec!["Slice", "stack"]);
    }

    #[test]
    fn test_letter_bar_disables_empty_buckets() {
        let visible = Location::new("t", "m", "step1.html", Some(1));
        let mut table = GlossaryTable::new();
        table.record("alpha", None, &visible, true).unwrap();
        let bar = render_letter_bar(&bucket_terms(&table));
        assert!(bar.contains(r#"<a class="letter" href="a.html">A</a>"#));
        assert!(bar.contains(r#"<span class="letter disabled">B</span>"#));
        assert!(bar.contains(r#"<span class="letter disabled">Symbols</span>"#));
    }
}
