//! Page generation: step pages, theme and course indexes, references.

use crate::builder::BuildError;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::html::{escape, link};
use crate::models::{CourseTree, Location, Module, PageLevel, Step, Theme};
use crate::navigation::{Navigation, Relation};
use crate::resolver::{PageContext, Resolver};
use crate::symbols::SymbolTables;
use crate::template_vars;
use crate::writer::PageWriter;

pub struct PageGenerator<'a> {
    config: &'a Config,
    tree: &'a CourseTree,
    tables: &'a SymbolTables,
    nav: &'a Navigation,
    resolver: Resolver<'a>,
}

impl<'a> PageGenerator<'a> {
    pub fn new(
        config: &'a Config,
        tree: &'a CourseTree,
        tables: &'a SymbolTables,
        nav: &'a Navigation,
    ) -> Self {
        Self {
            config,
            tree,
            tables,
            nav,
            resolver: Resolver::new(tree, tables, nav),
        }
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    /// Emit every visible step; returns the number of step pages written
    pub fn emit_steps(
        &self,
        writer: &mut PageWriter<'_>,
        diags: &mut Diagnostics,
    ) -> Result<usize, BuildError> {
        let mut emitted = 0;
        for theme in self.tree.included_themes() {
            for module in theme.included_modules() {
                for step in module.included_steps() {
                    self.emit_step(theme, module, step, writer, diags)?;
                    emitted += 1;
                }
            }
        }
        tracing::info!("Wrote {} step pages", emitted);
        Ok(emitted)
    }

    /// Resolve one step's tags and write `theme/module/stepNN.html`
    pub fn emit_step(
        &self,
        theme: &Theme,
        module: &Module,
        step: &Step,
        writer: &mut PageWriter<'_>,
        diags: &mut Diagnostics,
    ) -> Result<(), BuildError> {
        let Some(id) = step.output_id else {
            return Ok(());
        };
        let level = PageLevel::Step;
        let location = Location::new(&theme.name, &module.name, &step.file, Some(id));
        let content = self
            .resolver
            .resolve(&step.body, PageContext::step(&location), diags);

        let breadcrumb = format!(
            "<nav class=\"breadcrumb\">{} &gt; {} &gt; {} &gt; <span>Step {}</span></nav>",
            link(&format!("{}frontpage.html", level.prefix()), "crumb", &escape(&self.config.course.title)),
            link(&format!("{}{}/index.html", level.prefix(), theme.name), "crumb", &escape(&theme.title)),
            link(&module.step_file_name(1), "crumb", &escape(&module.title)),
            id
        );

        writer.render_page(
            "step",
            &format!("{}/{}/{}", theme.name, module.name, module.step_file_name(id)),
            level,
            template_vars! {
                "title" => escape(&step.title),
                "theme_title" => escape(&theme.title),
                "module_title" => escape(&module.title),
                "module_level" => escape(module.level.as_deref().unwrap_or_default()),
                "breadcrumb" => breadcrumb,
                "theme_dropdown" => self.nav.theme_dropdown(Some(&theme.name), level),
                "module_dropdown" => self.nav.module_dropdown(&theme.name, &module.name, level),
                "step_dropdown" => self.nav.step_dropdown(&theme.name, &module.name, id, level),
                "step_buttons" => self.nav.step_buttons(self.tree, &theme.name, &module.name, id).render(),
                "step_number" => id,
                "step_count" => module.max_step(),
                "content" => content,
            },
        )
    }

    /// Theme maps and text indexes, then the course-wide pages
    pub fn emit_index_pages(&self, writer: &mut PageWriter<'_>) -> Result<(), BuildError> {
        for theme in self.tree.included_themes() {
            self.emit_theme_pages(theme, writer)?;
        }

        let level = PageLevel::Root;
        let themes: Vec<&Theme> = self.tree.included_themes().collect();

        let mut course_index = String::new();
        let mut course_map = String::new();
        for theme in &themes {
            let heading = format!(
                "<h2>{}</h2>\n",
                link(&format!("{}/index.html", theme.name), "theme", &escape(&theme.title))
            );
            course_index.push_str(&heading);
            course_map.push_str(&format!("<section class=\"theme\" id=\"{}\">\n{}", escape(&theme.name), heading));
            for module in theme.included_modules() {
                course_index.push_str(&format!("<h3>{}</h3>\n", escape(&module.title)));
                course_index.push_str(&self.step_list(theme, module, level));
                course_map.push_str(&self.module_card(theme, module, level));
            }
            course_map.push_str("</section>\n");
        }

        writer.render_page(
            "course_index",
            "courseindex.html",
            level,
            template_vars! {
                "title" => "Course index",
                "theme_dropdown" => self.nav.theme_dropdown(None, level),
                "content" => course_index,
            },
        )?;

        writer.render_page(
            "course_map",
            "coursemap.html",
            level,
            template_vars! {
                "title" => "Course map",
                "theme_dropdown" => self.nav.theme_dropdown(None, level),
                "content" => course_map,
            },
        )?;

        let theme_list: String = themes
            .iter()
            .map(|theme| {
                format!(
                    "<li>{} <span class=\"count\">({} modules)</span></li>\n",
                    link(&format!("{}/index.html", theme.name), "theme", &escape(&theme.title)),
                    theme.included_modules().count()
                )
            })
            .collect();

        writer.render_page(
            "frontpage",
            "frontpage.html",
            level,
            template_vars! {
                "title" => escape(&self.config.course.title),
                "description" => escape(self.config.course.description.as_deref().unwrap_or_default()),
                "intro" => self.config.course.intro.clone().unwrap_or_default(),
                "theme_dropdown" => self.nav.theme_dropdown(None, level),
                "themes" => format!("<ul class=\"themes\">\n{}</ul>", theme_list),
            },
        )?;

        tracing::info!("Wrote index pages for {} themes", themes.len());
        Ok(())
    }

    fn emit_theme_pages(&self, theme: &Theme, writer: &mut PageWriter<'_>) -> Result<(), BuildError> {
        let level = PageLevel::Theme;

        let mut map = String::new();
        let mut text_index = String::new();
        for module in theme.included_modules() {
            map.push_str(&self.module_card(theme, module, level));
            text_index.push_str(&format!("<h2>{}</h2>\n", escape(&module.title)));
            text_index.push_str(&self.step_list(theme, module, level));
        }

        writer.render_page(
            "theme_map",
            &format!("{}/index.html", theme.name),
            level,
            template_vars! {
                "title" => escape(&theme.title),
                "theme_dropdown" => self.nav.theme_dropdown(Some(&theme.name), level),
                "content" => map,
            },
        )?;

        writer.render_page(
            "theme_index",
            &format!("{}/themeindex.html", theme.name),
            level,
            template_vars! {
                "title" => escape(&theme.title),
                "theme_dropdown" => self.nav.theme_dropdown(Some(&theme.name), level),
                "content" => text_index,
            },
        )
    }

    /// Write `references.html` when anything was cited
    pub fn emit_references(&self, writer: &mut PageWriter<'_>) -> Result<bool, BuildError> {
        let references = &self.tables.references;
        if references.is_empty() {
            return Ok(false);
        }

        let level = PageLevel::Root;
        let mut items = String::from("<ol class=\"references\">\n");
        for citation in references.citations() {
            let text = escape(citation.text.as_deref().unwrap_or(&citation.key));
            let url = citation
                .url
                .as_deref()
                .map(|u| format!(" {}", link(u, "external", &escape(u))))
                .unwrap_or_default();
            let backlinks: Vec<String> = citation
                .locations
                .iter()
                .filter_map(|loc| self.tree.location_path(loc))
                .enumerate()
                .map(|(i, path)| link(&path, "backlink", &(i + 1).to_string()))
                .collect();
            items.push_str(&format!(
                "<li id=\"ref-{}\">{}{} <span class=\"backlinks\">Cited in: {}</span></li>\n",
                escape(&citation.key),
                text,
                url,
                backlinks.join(", ")
            ));
        }
        items.push_str("</ol>");

        writer.render_page(
            "references",
            "references.html",
            level,
            template_vars! {
                "title" => "References",
                "theme_dropdown" => self.nav.theme_dropdown(None, level),
                "content" => items,
            },
        )?;
        Ok(true)
    }

    fn step_list(&self, theme: &Theme, module: &Module, level: PageLevel) -> String {
        let mut html = String::from("<ol class=\"steps\">\n");
        for step in module.included_steps() {
            if let Some(id) = step.output_id {
                let href = format!(
                    "{}{}/{}/{}",
                    level.prefix(),
                    theme.name,
                    module.name,
                    module.step_file_name(id)
                );
                html.push_str(&format!("  <li>{}</li>\n", link(&href, "step", &escape(&step.title))));
            }
        }
        html.push_str("</ol>\n");
        html
    }

    /// Module summary with its declared relationships
    fn module_card(&self, theme: &Theme, module: &Module, level: PageLevel) -> String {
        let href = format!(
            "{}{}/{}/{}",
            level.prefix(),
            theme.name,
            module.name,
            module.step_file_name(1)
        );
        let level_class = module
            .level
            .as_deref()
            .map(|l| format!(" level-{}", escape(l)))
            .unwrap_or_default();

        let mut html = format!(
            "<div class=\"module{}\" id=\"{}\">\n<h3>{}</h3>\n<p class=\"step-count\">{} steps</p>\n",
            level_class,
            escape(&module.name),
            link(&href, "module", &escape(&module.title)),
            module.max_step()
        );

        if let Some(relations) = self.nav.relationships(&theme.name, &module.name) {
            for (relation, label) in [
                (Relation::Prerequisite, "Prerequisites"),
                (Relation::LeadsTo, "Leads to"),
            ] {
                let links: Vec<String> = relations
                    .with_relation(relation)
                    .map(|e| {
                        link(
                            &format!("{}{}", level.prefix(), e.href),
                            relation.as_str(),
                            &escape(&e.title),
                        )
                    })
                    .collect();
                if !links.is_empty() {
                    html.push_str(&format!(
                        "<p class=\"{}\">{}: {}</p>\n",
                        relation.as_str(),
                        label,
                        links.join(", ")
                    ));
                }
            }
        }

        html.push_str("</div>\n");
        html
    }
}
