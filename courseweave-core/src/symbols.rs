//! Pass 1: step numbering and the global symbol tables.
//!
//! The whole tree is walked once, theme by theme, module by module, steps in
//! numeric filename order. Visible steps get contiguous output ids and every
//! body is scanned for anchor definitions, glossary occurrences and
//! citations. The resulting tables are frozen before pass 2 starts, so a tag
//! may refer to something defined anywhere else in the course.

use crate::builder::BuildError;
use crate::models::{CourseTree, Location};
use crate::ordering::compare_numeric;
use crate::tags::{self, Node, TagName};
use std::collections::{BTreeMap, HashMap};

/// Anchor name to the step that defines it
#[derive(Debug, Clone, Default)]
pub struct AnchorTable {
    entries: HashMap<String, Location>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anchor; a second definition of the same name is fatal
    pub fn insert(&mut self, name: &str, location: Location) -> Result<(), BuildError> {
        if let Some(first) = self.entries.get(name) {
            return Err(BuildError::AnchorRedefined {
                name: name.to_string(),
                first: first.clone(),
                second: location,
            });
        }
        self.entries.insert(name.to_string(), location);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub key: String,
    /// Display form, as first written
    pub term: String,
    /// Raw tagged definition body
    pub definition: Option<String>,
    pub defined_at: Option<Location>,
    /// One entry per occurrence in a visible step
    pub references: Vec<Location>,
}

/// Normalized glossary key: lower-cased, spaces to underscores, URL-encoded
pub fn glossary_key(term: &str) -> String {
    let normalized = term.trim().to_lowercase().replace(' ', "_");
    urlencoding::encode(&normalized).into_owned()
}

/// Glossary entries keyed and ordered by normalized key
#[derive(Debug, Clone, Default)]
pub struct GlossaryTable {
    entries: BTreeMap<String, GlossaryEntry>,
}

impl GlossaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `term`.
    ///
    /// A definition is accepted from any step, excluded or not, but only
    /// once per key. The occurrence counts as a reference only when the
    /// step is visible.
    pub fn record(
        &mut self,
        term: &str,
        definition: Option<&str>,
        location: &Location,
        included: bool,
    ) -> Result<(), BuildError> {
        let key = glossary_key(term);
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| GlossaryEntry {
                key,
                term: term.trim().to_string(),
                definition: None,
                defined_at: None,
                references: Vec::new(),
            });

        if let Some(body) = definition {
            if let Some(first) = &entry.defined_at {
                return Err(BuildError::GlossaryRedefined {
                    term: entry.term.clone(),
                    first: first.clone(),
                    second: location.clone(),
                });
            }
            entry.definition = Some(body.to_string());
            entry.defined_at = Some(location.clone());
        }

        if included {
            entry.references.push(location.clone());
        }
        Ok(())
    }

    pub fn get(&self, term: &str) -> Option<&GlossaryEntry> {
        self.entries.get(&glossary_key(term))
    }

    /// Entries in key order
    pub fn entries(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub key: String,
    pub text: Option<String>,
    pub url: Option<String>,
    pub locations: Vec<Location>,
}

/// Citations from `[ref]` tags, numbered in order of first use
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    citations: Vec<Citation>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a citation from a visible step; the first text and url win
    pub fn cite(&mut self, key: &str, text: Option<&str>, url: Option<&str>, location: &Location) {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.citations.push(Citation {
                    key: key.to_string(),
                    text: None,
                    url: None,
                    locations: Vec::new(),
                });
                self.index.insert(key.to_string(), self.citations.len() - 1);
                self.citations.len() - 1
            }
        };

        let citation = &mut self.citations[idx];
        if citation.text.is_none() {
            citation.text = text.map(str::to_string);
        }
        if citation.url.is_none() {
            citation.url = url.map(str::to_string);
        }
        citation.locations.push(location.clone());
    }

    /// 1-based citation number
    pub fn number(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|idx| idx + 1)
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

/// Everything pass 1 produces; read-only from here on
#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    pub anchors: AnchorTable,
    pub glossary: GlossaryTable,
    pub references: ReferenceTable,
    pub included_steps: usize,
}

/// Run pass 1 over the whole tree.
///
/// Sorts every module's steps into numeric filename order, settles the
/// `excluded` flag of each step from its theme and module, and assigns
/// output ids to the visible ones.
pub fn build(tree: &mut CourseTree) -> Result<SymbolTables, BuildError> {
    let mut tables = SymbolTables::default();

    for theme in &mut tree.themes {
        for module in &mut theme.modules {
            module.steps.sort_by(|a, b| compare_numeric(&a.file, &b.file));

            let mut next_id = 1;
            for step in &mut module.steps {
                step.excluded = theme.excluded || module.excluded || step.excluded;
                step.output_id = if step.excluded {
                    None
                } else {
                    next_id += 1;
                    Some(next_id - 1)
                };

                let location = Location::new(&theme.name, &module.name, &step.file, step.output_id);
                scan_step(&step.body, &location, !step.excluded, &mut tables)?;

                if !step.excluded {
                    tables.included_steps += 1;
                    tracing::debug!("Numbered {} as step {}", step.file, next_id - 1);
                }
            }
        }
    }

    tracing::info!(
        "Pass 1: {} visible steps, {} anchors, {} glossary terms, {} citations",
        tables.included_steps,
        tables.anchors.len(),
        tables.glossary.len(),
        tables.references.citations().len()
    );

    Ok(tables)
}

fn scan_step(
    body: &str,
    location: &Location,
    included: bool,
    tables: &mut SymbolTables,
) -> Result<(), BuildError> {
    for node in tags::parse(body) {
        let Node::Tag(tag) = node else {
            continue;
        };
        match tag.name {
            TagName::Target => {
                // A nameless target is reported when the page is resolved
                if let Some(name) = tag.attr("name") {
                    tables.anchors.insert(name, location.clone())?;
                }
            }
            TagName::Glossary => {
                if let Some(term) = tag.attr("term") {
                    tables
                        .glossary
                        .record(term, tag.trimmed_body(), location, included)?;
                }
            }
            TagName::Ref => {
                if let (true, Some(key)) = (included, tag.attr("name")) {
                    tables
                        .references
                        .cite(key, tag.attr("text"), tag.attr("url"), location);
                }
            }
            _ => {}
        }

        // Popup and link bodies are rendered into the step itself; a glossary
        // body only ever appears on the glossary page
        if let (TagName::Local | TagName::Link, Some(inner)) = (tag.name, tag.body) {
            scan_step(inner, location, included, tables)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Module, Step, Theme};
    use std::path::PathBuf;

    fn step(file: &str, body: &str) -> Step {
        Step {
            file: file.to_string(),
            source_path: PathBuf::from(file),
            title: file.to_string(),
            body: body.to_string(),
            excluded: false,
            output_id: None,
        }
    }

    fn module(name: &str, steps: Vec<Step>) -> Module {
        Module {
            name: name.to_string(),
            title: name.to_string(),
            level: None,
            indexorder: Some(1),
            prerequisites: vec![],
            leadsto: vec![],
            excluded: false,
            steps,
        }
    }

    fn tree(modules: Vec<Module>) -> CourseTree {
        CourseTree {
            themes: vec![Theme {
                name: "basics".into(),
                title: "Basics".into(),
                indexorder: Some(1),
                excluded: false,
                modules,
            }],
        }
    }

    fn ids(module: &Module) -> Vec<(&str, Option<u32>)> {
        module
            .steps
            .iter()
            .map(|s| (s.file.as_str(), s.output_id))
            .collect()
    }

    #[test]
    fn test_numeric_order_assigns_output_ids() {
        let mut t = tree(vec![module(
            "intro",
            vec![step("step1.html", ""), step("step10.html", ""), step("step2.html", "")],
        )]);
        let tables = build(&mut t).unwrap();

        assert_eq!(
            ids(&t.themes[0].modules[0]),
            vec![
                ("step1.html", Some(1)),
                ("step2.html", Some(2)),
                ("step10.html", Some(3))
            ]
        );
        assert_eq!(tables.included_steps, 3);
    }

    #[test]
    fn test_excluded_steps_leave_no_gaps() {
        let mut s2 = step("step2.html", "");
        s2.excluded = true;
        let mut t = tree(vec![module(
            "intro",
            vec![step("step1.html", ""), s2, step("step3.html", ""), step("step4.html", "")],
        )]);
        build(&mut t).unwrap();

        let visible: Vec<u32> = t.themes[0].modules[0]
            .steps
            .iter()
            .filter_map(|s| s.output_id)
            .collect();
        assert_eq!(visible, vec![1, 2, 3]);
        assert_eq!(t.themes[0].modules[0].steps[1].output_id, None);
    }

    #[test]
    fn test_exclusion_propagates_from_module_and_theme() {
        let mut excluded_module = module("advanced", vec![step("step1.html", "")]);
        excluded_module.excluded = true;
        let mut t = tree(vec![module("intro", vec![step("step1.html", "")]), excluded_module]);
        build(&mut t).unwrap();
        assert!(t.themes[0].modules[1].steps[0].excluded);
        assert_eq!(t.themes[0].modules[1].steps[0].output_id, None);

        t.themes[0].excluded = true;
        let tables = build(&mut t).unwrap();
        assert_eq!(tables.included_steps, 0);
    }

    #[test]
    fn test_anchor_redefinition_names_both_locations() {
        let mut t = tree(vec![
            module("intro", vec![step("step1.html", r#"[target name="dup"]"#)]),
            module("more", vec![step("step4.html", r#"x [target name="dup"]"#)]),
        ]);
        let err = build(&mut t).unwrap_err();
        match &err {
            BuildError::AnchorRedefined {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "dup");
                assert_eq!(first.module, "intro");
                assert_eq!(second.module, "more");
            }
            other => panic!("unexpected error {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("basics/intro/step1.html"));
        assert!(message.contains("basics/more/step4.html"));
    }

    #[test]
    fn test_glossary_definition_from_excluded_step() {
        let mut hidden = step("step2.html", r#"[glossary term="Heap"]Dynamic memory.[/glossary]"#);
        hidden.excluded = true;
        let mut t = tree(vec![module(
            "intro",
            vec![step("step1.html", r#"See the [glossary term="heap" /]."#), hidden],
        )]);
        let tables = build(&mut t).unwrap();

        let entry = tables.glossary.get("HEAP").unwrap();
        assert_eq!(entry.definition.as_deref(), Some("Dynamic memory."));
        assert_eq!(entry.defined_at.as_ref().unwrap().file, "step2.html");
        assert_eq!(entry.references.len(), 1);
        assert_eq!(entry.references[0].file, "step1.html");
    }

    #[test]
    fn test_glossary_redefinition_is_fatal_even_when_excluded() {
        let mut a = step("step1.html", r#"[glossary term="stack"]One.[/glossary]"#);
        let mut b = step("step2.html", r#"[glossary term="Stack"]Two.[/glossary]"#);
        a.excluded = true;
        b.excluded = true;
        let mut t = tree(vec![module("intro", vec![a, b])]);
        let err = build(&mut t).unwrap_err();
        assert!(matches!(err, BuildError::GlossaryRedefined { ref term, .. } if term == "stack"));
    }

    #[test]
    fn test_glossary_reference_only_in_excluded_step() {
        let mut hidden = step("step1.html", r#"[glossary term="lifetime"]Scope of a borrow.[/glossary]"#);
        hidden.excluded = true;
        let mut t = tree(vec![module("intro", vec![hidden, step("step2.html", "plain")])]);
        let tables = build(&mut t).unwrap();
        let entry = tables.glossary.get("lifetime").unwrap();
        assert!(entry.definition.is_some());
        assert!(entry.references.is_empty());
    }

    #[test]
    fn test_tags_inside_paired_bodies_are_collected() {
        let mut t = tree(vec![module(
            "intro",
            vec![step(
                "step1.html",
                r#"[local text="More"][target name="inner"][ref name="book"][/local] [link to="inner"]see [glossary term="heap"/][/link]"#,
            )],
        )]);
        let tables = build(&mut t).unwrap();

        assert_eq!(tables.anchors.get("inner").unwrap().file, "step1.html");
        assert_eq!(tables.references.number("book"), Some(1));
        assert_eq!(tables.glossary.get("heap").unwrap().references.len(), 1);
    }

    #[test]
    fn test_glossary_key_normalization() {
        assert_eq!(glossary_key("Borrow Checker"), "borrow_checker");
        assert_eq!(glossary_key(" C++ "), "c%2B%2B");
        assert_eq!(glossary_key("naïve"), "na%C3%AFve");
    }

    #[test]
    fn test_citations_only_from_visible_steps() {
        let mut hidden = step("step2.html", r#"[ref name="knuth" text="Knuth"]"#);
        hidden.excluded = true;
        let mut t = tree(vec![module(
            "intro",
            vec![
                step("step1.html", r#"[ref name="tapl" text="Pierce" url="https://example.org"]"#),
                hidden,
                step("step3.html", r#"[ref name="tapl"] [ref name="rbe"]"#),
            ],
        )]);
        let tables = build(&mut t).unwrap();
        let refs = &tables.references;
        assert_eq!(refs.number("tapl"), Some(1));
        assert_eq!(refs.number("rbe"), Some(2));
        assert_eq!(refs.number("knuth"), None);
        assert_eq!(refs.citations()[0].locations.len(), 2);
        assert_eq!(refs.citations()[0].url.as_deref(), Some("https://example.org"));
    }
}
