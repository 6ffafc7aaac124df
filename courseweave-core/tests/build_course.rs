use courseweave_core::media::{self, UsedMedia};
use courseweave_core::{
    BuildError, Config, CourseBuilder, DirectoryLoader, ExcludeFilter, TemplateEngine,
    TemplateError, TemplateVars,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Dumps every variable so tests can look for fragments
struct EchoTemplates;

impl TemplateEngine for EchoTemplates {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        let mut out = format!("<!-- {} -->\n", name);
        for (key, value) in vars {
            out.push_str(&format!("<div data-var=\"{}\">{}</div>\n", key, value));
        }
        Ok(out)
    }
}

/// Knows every page except the references page
struct NoReferences;

impl TemplateEngine for NoReferences {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        if name == "references" {
            return Err(TemplateError::Missing(name.to_string()));
        }
        EchoTemplates.render(name, vars)
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn step(root: &Path, rel: &str, title: &str, body: &str) {
    write(
        &root.join(rel),
        &format!("<html><head><title>{title}</title></head><body>{body}</body></html>"),
    );
}

/// Two themes; `basics/intro/step2.html` is excluded by the config
fn sample_course(root: &Path) -> Config {
    let content = root.join("content");
    write(&content.join("basics/theme.yml"), "title: Basics\nindexorder: 1\n");
    write(
        &content.join("basics/intro/module.yml"),
        "title: Introduction\nindexorder: 1\nlevel: beginner\nleadsto: [memory]\n",
    );
    write(
        &content.join("basics/memory/module.yml"),
        "title: Memory\nindexorder: 2\nprerequisites: [intro]\n",
    );
    write(&content.join("advanced/theme.yml"), "title: Advanced\nindexorder: 2\n");
    write(
        &content.join("advanced/functions/module.yml"),
        "title: Functions\nindexorder: 1\n",
    );

    step(
        &content,
        "basics/intro/step1.html",
        "Welcome",
        r#"<p>See [link to="closures"]closures[/link] and the [glossary term="heap"/].
[ref name="book" text="The Rust Book" url="https://doc.rust-lang.org/book/"]
<img src="media/diagram.png"></p>[next]"#,
    );
    step(
        &content,
        "basics/intro/step2.html",
        "Draft",
        r#"[target name="draft-only"][glossary term="heap"]Memory allocated at run time.[/glossary]"#,
    );
    step(
        &content,
        "basics/intro/step10.html",
        "Wrap up",
        r#"[target name="intro-end"][link to="missing"]gone[/link] [link to="draft-only"]draft[/link][prev]"#,
    );
    step(
        &content,
        "basics/memory/step1.html",
        "Stack",
        r#"[img name="stack.png" type="diagram" alt="Stack frames"] Back to [link to="intro-end"]the intro[/link]."#,
    );
    step(
        &content,
        "advanced/functions/step1.html",
        "Closures",
        r#"[target name="closures"]Closures capture the [glossary term="Heap"/] sometimes."#,
    );

    let media = root.join("media-src");
    write(&media.join("diagram.png"), "png");
    write(&media.join("figures/stack.png"), "png");
    write(&media.join("orphan.gif"), "gif");

    let mut config = Config::new("Rust", content, root.join("site"));
    config.paths.media = Some(media);
    config.filter.exclude_steps = vec!["basics/intro/step2.html".to_string()];
    config
}

fn loader_for(config: &Config) -> DirectoryLoader {
    DirectoryLoader::new(config.content_dir(), ExcludeFilter::new(config.filter.clone()))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{:?}: {}", path, e))
}

#[test]
fn test_full_build_writes_cross_linked_pages() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let loader = loader_for(&config);
    let site = config.output_dir();

    let report = CourseBuilder::new(config).build(&loader, &EchoTemplates).unwrap();
    assert_eq!(report.included_steps, 4);
    assert!(report.references_page);
    assert_eq!(report.glossary_terms, 1);

    // step2 is excluded so step10 becomes the second page
    let step1 = read(&site.join("basics/intro/step01.html"));
    let step2 = read(&site.join("basics/intro/step02.html"));
    assert!(!site.join("basics/intro/step03.html").exists());

    // forward reference into a later theme
    assert!(step1.contains(
        r#"<a class="anchor-link" href="../../advanced/functions/step01.html#closures">closures</a>"#
    ));
    assert!(step1.contains(r#"href="../../glossary/h.html#heap""#));
    assert!(step1.contains(r#"<a class="ref" href="../../references.html#ref-book">[1]</a>"#));
    assert!(step1.contains(r#"<a class="nav-button next" href="step02.html">Next</a>"#));

    // broken and excluded targets degrade in place
    assert!(step2.contains(r#"<span class="error">[unresolved link: missing]</span> gone"#));
    assert!(step2.contains("is not part of this build"));
    assert!(step2.contains(r#"<a class="nav-button prev" href="step01.html">Previous</a>"#));

    let memory = read(&site.join("basics/memory/step01.html"));
    assert!(memory.contains(r#"href="../../basics/intro/step02.html#intro-end""#));
    assert!(memory.contains(r#"src="../../media/stack.png""#));
    assert!(memory.contains(r#"<option class="prerequisite""#));

    for page in [
        "basics/index.html",
        "basics/themeindex.html",
        "advanced/index.html",
        "courseindex.html",
        "coursemap.html",
        "frontpage.html",
        "references.html",
        "glossary/index.html",
    ] {
        assert!(site.join(page).is_file(), "missing {}", page);
    }

    let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert!(codes.contains(&"link.unresolved"));
    assert!(codes.contains(&"link.excluded-target"));
}

#[test]
fn test_glossary_uses_definition_from_excluded_step() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let loader = loader_for(&config);
    let site = config.output_dir();

    CourseBuilder::new(config).build(&loader, &EchoTemplates).unwrap();

    let page = read(&site.join("glossary/h.html"));
    assert!(page.contains(r#"<dt id="heap">heap</dt>"#));
    assert!(page.contains("Memory allocated at run time."));
    // back-links only to visible uses, in tree order
    assert!(page.contains(
        r#"<a class="backlink" href="../basics/intro/step01.html">1</a>, <a class="backlink" href="../advanced/functions/step01.html">2</a>"#
    ));
    assert!(!site.join("glossary/a.html").exists());
}

#[test]
fn test_media_gc_removes_unreferenced_files() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let loader = loader_for(&config);
    let media_dir = config.output_dir().join("media");

    let report = CourseBuilder::new(config).build(&loader, &EchoTemplates).unwrap();
    assert_eq!(report.media.removed, vec!["orphan.gif"]);
    assert!(media_dir.join("diagram.png").is_file());
    assert!(media_dir.join("stack.png").is_file());
    assert!(!media_dir.join("orphan.gif").exists());

    let mut used = UsedMedia::new();
    used.record("diagram.png");
    used.record("stack.png");
    let again = media::reconcile(&media_dir, &used).unwrap();
    assert!(again.removed.is_empty() && again.renamed.is_empty());
}

#[test]
fn test_keep_media_survives_gc() {
    let dir = tempdir().unwrap();
    let mut config = sample_course(dir.path());
    config.keep_media = vec!["orphan.gif".to_string()];
    let loader = loader_for(&config);
    let media_dir = config.output_dir().join("media");

    let report = CourseBuilder::new(config).build(&loader, &EchoTemplates).unwrap();
    assert!(report.media.removed.is_empty());
    assert!(media_dir.join("orphan.gif").is_file());
}

#[test]
fn test_media_inside_popups_and_odd_names_survive_gc() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let content = config.content_dir();
    step(
        &content,
        "advanced/functions/step2.html",
        "Figures",
        r#"[local text="Figure"][target name="in-popup"][img name="pic.png" alt="p"][/local]
[img name="my photo.png" alt="m"] [img name="a&b.png" alt="a"]"#,
    );
    step(
        &content,
        "advanced/functions/step3.html",
        "Back",
        r#"See [link to="in-popup"]the figure[/link]."#,
    );
    let media = config.paths.media.clone().unwrap();
    for name in ["pic.png", "my photo.png", "a&b.png"] {
        write(&media.join(name), name);
    }
    let loader = loader_for(&config);
    let site = config.output_dir();
    let media_dir = site.join("media");

    let report = CourseBuilder::new(config).build(&loader, &EchoTemplates).unwrap();
    assert_eq!(report.media.removed, vec!["orphan.gif"]);
    for name in ["pic.png", "my photo.png", "a&b.png"] {
        assert!(media_dir.join(name).is_file(), "{} was removed", name);
    }

    let back = read(&site.join("advanced/functions/step03.html"));
    assert!(back.contains(r#"href="../../advanced/functions/step02.html#in-popup""#));
    assert_eq!(report.diagnostics.with_code("link.unresolved").count(), 1);
}

#[test]
fn test_verify_checks_glossary_definitions() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    step(
        &config.content_dir(),
        "advanced/functions/step2.html",
        "Terms",
        r#"[glossary term="stack"/] [glossary term="frame"]Part of the [link to="nowhere"]stack[/link].[/glossary]"#,
    );
    let loader = loader_for(&config);

    let report = CourseBuilder::new(config).verify(&loader).unwrap();
    assert_eq!(report.glossary_terms, 3);
    assert_eq!(report.diagnostics.with_code("glossary.undefined").count(), 1);
    // one from step10, one inside the definition of "frame"
    assert_eq!(report.diagnostics.with_code("link.unresolved").count(), 2);
}

#[test]
fn test_anchor_redefinition_aborts_with_both_locations() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    step(
        &config.content_dir(),
        "advanced/functions/step2.html",
        "Again",
        r#"[target name="intro-end"]"#,
    );
    let loader = loader_for(&config);
    let site = config.output_dir();

    let err = CourseBuilder::new(config)
        .build(&loader, &EchoTemplates)
        .unwrap_err();
    assert!(matches!(err, BuildError::AnchorRedefined { ref name, .. } if name == "intro-end"));
    let message = err.to_string();
    assert!(message.contains("basics/intro/step10.html"));
    assert!(message.contains("advanced/functions/step2.html"));
    assert!(!site.exists());
}

#[test]
fn test_glossary_redefinition_in_excluded_steps_is_fatal() {
    let dir = tempdir().unwrap();
    let mut config = sample_course(dir.path());
    step(
        &config.content_dir(),
        "advanced/functions/step2.html",
        "Hidden",
        r#"[glossary term="HEAP"]Another definition.[/glossary]"#,
    );
    config
        .filter
        .exclude_steps
        .push("advanced/functions/step2.html".to_string());
    let loader = loader_for(&config);

    let err = CourseBuilder::new(config).verify(&loader).unwrap_err();
    assert!(matches!(err, BuildError::GlossaryRedefined { .. }));
}

#[test]
fn test_missing_indexorder_is_fatal() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    write(
        &config.content_dir().join("advanced/theme.yml"),
        "title: Advanced\n",
    );
    let loader = loader_for(&config);

    let err = CourseBuilder::new(config).verify(&loader).unwrap_err();
    assert!(matches!(err, BuildError::MissingIndexOrder { kind: "theme", ref name } if name == "advanced"));
}

#[test]
fn test_missing_template_is_fatal() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let loader = loader_for(&config);

    let err = CourseBuilder::new(config).build(&loader, &NoReferences).unwrap_err();
    assert!(matches!(err, BuildError::Template(TemplateError::Missing(ref n)) if n == "references"));
}

#[test]
fn test_verify_collects_diagnostics_without_writing() {
    let dir = tempdir().unwrap();
    let config = sample_course(dir.path());
    let loader = loader_for(&config);
    let site = config.output_dir();

    let report = CourseBuilder::new(config).verify(&loader).unwrap();
    assert_eq!(report.included_steps, 4);
    assert_eq!(report.pages_written, 0);
    assert_eq!(report.diagnostics.with_code("link.unresolved").count(), 1);
    assert!(!site.exists());
}
