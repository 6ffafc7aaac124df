//! Dropdown menus and previous/next buttons built from the numbered tree.
//!
//! Every entry carries its relation to the page being rendered, so the
//! current item is marked while rendering instead of by patching markup.

use crate::builder::BuildError;
use crate::html::escape;
use crate::models::{CourseTree, Module, PageLevel};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Current,
    Prerequisite,
    LeadsTo,
    Plain,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Current => "current",
            Relation::Prerequisite => "prerequisite",
            Relation::LeadsTo => "leadsto",
            Relation::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownEntry {
    pub id: String,
    pub title: String,
    /// Target path relative to the output root
    pub href: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dropdown {
    pub entries: Vec<DropdownEntry>,
}

impl Dropdown {
    /// Render as a `<select>` menu; the entry whose id is `current` is selected
    pub fn render(&self, class: &str, level: PageLevel, current: Option<&str>) -> String {
        let prefix = level.prefix();
        let mut html = format!(
            "<select class=\"nav-dropdown {}\" onchange=\"window.location.href=this.value\">\n",
            class
        );
        for entry in &self.entries {
            let relation = if current == Some(entry.id.as_str()) {
                Relation::Current
            } else {
                entry.relation
            };
            let selected = if relation == Relation::Current {
                " selected"
            } else {
                ""
            };
            let suffix = match relation {
                Relation::Prerequisite => " (prerequisite)",
                Relation::LeadsTo => " (leads to)",
                _ => "",
            };
            html.push_str(&format!(
                "  <option class=\"{}\" value=\"{}{}\"{}>{}{}</option>\n",
                relation.as_str(),
                prefix,
                escape(&entry.href),
                selected,
                escape(&entry.title),
                suffix
            ));
        }
        html.push_str("</select>");
        html
    }

    pub fn with_relation(&self, relation: Relation) -> impl Iterator<Item = &DropdownEntry> {
        self.entries.iter().filter(move |e| e.relation == relation)
    }
}

/// Previous/next targets of a step, file names within the module directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepButtons {
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl StepButtons {
    pub fn render(&self) -> String {
        format!(
            "<div class=\"step-buttons\">{} {}</div>",
            button("prev", "Previous", self.prev.as_deref()),
            button("next", "Next", self.next.as_deref())
        )
    }

    pub fn render_prev(&self) -> String {
        button("prev", "Previous", self.prev.as_deref())
    }

    pub fn render_next(&self) -> String {
        button("next", "Next", self.next.as_deref())
    }
}

fn button(class: &str, label: &str, href: Option<&str>) -> String {
    match href {
        Some(href) => format!(
            "<a class=\"nav-button {}\" href=\"{}\">{}</a>",
            class,
            escape(href),
            label
        ),
        None => format!(
            "<span class=\"nav-button {} disabled\">{}</span>",
            class, label
        ),
    }
}

type ModuleKey = (String, String);

fn key(theme: &str, module: &str) -> ModuleKey {
    (theme.to_string(), module.to_string())
}

/// Navigation fragments for the whole course
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    themes: Dropdown,
    modules: HashMap<ModuleKey, Dropdown>,
    steps: HashMap<ModuleKey, Dropdown>,
    max_steps: HashMap<ModuleKey, u32>,
}

impl Navigation {
    /// Build all dropdowns; requires pass 1 to have numbered the tree.
    pub fn build(tree: &CourseTree) -> Result<Self, BuildError> {
        let mut nav = Navigation::default();

        for theme in tree.included_themes() {
            if theme.indexorder.is_none() {
                return Err(BuildError::MissingIndexOrder {
                    kind: "theme",
                    name: theme.name.clone(),
                });
            }
            nav.themes.entries.push(DropdownEntry {
                id: theme.name.clone(),
                title: theme.title.clone(),
                href: format!("{}/index.html", theme.name),
                relation: Relation::Plain,
            });

            for module in theme.included_modules() {
                if module.indexorder.is_none() {
                    return Err(BuildError::MissingIndexOrder {
                        kind: "module",
                        name: format!("{}/{}", theme.name, module.name),
                    });
                }
                if module.max_step() == 0 {
                    return Err(BuildError::EmptyModule {
                        theme: theme.name.clone(),
                        module: module.name.clone(),
                    });
                }
            }

            for module in theme.included_modules() {
                let k = key(&theme.name, &module.name);
                nav.modules.insert(
                    k.clone(),
                    relationship_dropdown(&theme.name, module, theme.included_modules()),
                );
                nav.steps.insert(k.clone(), step_dropdown(&theme.name, module));
                nav.max_steps.insert(k, module.max_step());
            }
        }

        tracing::info!(
            "Navigation: {} themes, {} modules",
            nav.themes.entries.len(),
            nav.modules.len()
        );
        Ok(nav)
    }

    pub fn theme_dropdown(&self, current: Option<&str>, level: PageLevel) -> String {
        self.themes.render("themes", level, current)
    }

    pub fn module_dropdown(&self, theme: &str, module: &str, level: PageLevel) -> String {
        self.modules
            .get(&key(theme, module))
            .map(|d| d.render("modules", level, None))
            .unwrap_or_default()
    }

    pub fn step_dropdown(&self, theme: &str, module: &str, step: u32, level: PageLevel) -> String {
        let current = step.to_string();
        self.steps
            .get(&key(theme, module))
            .map(|d| d.render("steps", level, Some(&current)))
            .unwrap_or_default()
    }

    /// Relationship data of a module, as shown in its dropdown
    pub fn relationships(&self, theme: &str, module: &str) -> Option<&Dropdown> {
        self.modules.get(&key(theme, module))
    }

    pub fn themes(&self) -> &Dropdown {
        &self.themes
    }

    /// Previous/next pair, disabled at step 1 and at the module's last step
    pub fn step_buttons(&self, tree: &CourseTree, theme: &str, module: &str, step: u32) -> StepButtons {
        let max = self.max_steps.get(&key(theme, module)).copied().unwrap_or(0);
        let file = |id: u32| tree.find_module(theme, module).map(|m| m.step_file_name(id));
        StepButtons {
            prev: if step > 1 { file(step - 1) } else { None },
            next: if step < max { file(step + 1) } else { None },
        }
    }
}

/// Sibling modules tagged relative to `module`.
///
/// Only the relationships declared on `module` itself count; a sibling that
/// lists `module` as its own prerequisite is not reflected back.
fn relationship_dropdown<'a>(
    theme: &str,
    module: &Module,
    siblings: impl Iterator<Item = &'a Module>,
) -> Dropdown {
    let entries = siblings
        .map(|sibling| {
            let relation = if sibling.name == module.name {
                Relation::Current
            } else if module.prerequisites.contains(&sibling.name) {
                Relation::Prerequisite
            } else if module.leadsto.contains(&sibling.name) {
                Relation::LeadsTo
            } else {
                Relation::Plain
            };
            DropdownEntry {
                id: sibling.name.clone(),
                title: sibling.title.clone(),
                href: format!("{}/{}/{}", theme, sibling.name, sibling.step_file_name(1)),
                relation,
            }
        })
        .collect();
    Dropdown { entries }
}

fn step_dropdown(theme: &str, module: &Module) -> Dropdown {
    let mut steps: Vec<_> = module.included_steps().collect();
    steps.sort_by_key(|s| s.output_id);
    let entries = steps
        .into_iter()
        .filter_map(|s| {
            let id = s.output_id?;
            Some(DropdownEntry {
                id: id.to_string(),
                title: format!("{}. {}", id, s.title),
                href: format!("{}/{}/{}", theme, module.name, module.step_file_name(id)),
                relation: Relation::Plain,
            })
        })
        .collect();
    Dropdown { entries }
}
