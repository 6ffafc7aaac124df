use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, contents)
}

/// One theme, one module, two steps, plus a config pointing at them
fn scaffold(root: &Path, extra_step: &str) -> std::io::Result<()> {
    write(
        &root.join("courseweave.yml"),
        r#"
course:
  title: "Test Course"
  description: "A tiny course"
paths:
  content: "content"
  output: "site"
  media: "media"
"#,
    )?;
    write(&root.join("content/basics/theme.yml"), "title: Basics\nindexorder: 1\n")?;
    write(
        &root.join("content/basics/intro/module.yml"),
        "title: Intro\nindexorder: 1\n",
    )?;
    write(
        &root.join("content/basics/intro/step1.html"),
        r#"<html><head><title>Hello</title></head><body>
<p>[target name="start"]Meet the [glossary term="borrow checker"]The part of the compiler that checks references.[/glossary].</p>
</body></html>"#,
    )?;
    write(
        &root.join("content/basics/intro/step2.html"),
        &format!(
            "<html><head><title>Next</title></head><body><p>[link to=\"start\"]Back[/link] {}</p></body></html>",
            extra_step
        ),
    )?;
    write(&root.join("media/style.css"), "body {}")?;
    write(&root.join("media/unused.png"), "png")?;
    Ok(())
}

#[test]
fn build_writes_course_package() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path(), "")?;

    #[allow(deprecated)]
    Command::cargo_bin("courseweave")?
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 steps"));

    let site = dir.path().join("site");
    for page in [
        "basics/intro/step01.html",
        "basics/intro/step02.html",
        "basics/index.html",
        "courseindex.html",
        "coursemap.html",
        "frontpage.html",
        "glossary/index.html",
        "glossary/b.html",
    ] {
        assert!(site.join(page).is_file(), "missing {}", page);
    }

    let step2 = fs::read_to_string(site.join("basics/intro/step02.html"))?;
    assert!(step2.contains(r#"href="../../basics/intro/step01.html#start""#));
    assert!(step2.contains("Test Course"));

    // the stylesheet is referenced by every page, the png by none
    assert!(site.join("media/style.css").is_file());
    assert!(!site.join("media/unused.png").exists());
    Ok(())
}

#[test]
fn verify_json_reports_diagnostics() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path(), r#"[link to="nowhere"]lost[/link]"#)?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("courseweave")?
        .current_dir(dir.path())
        .args(["verify", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    assert_eq!(value["steps"], 2);
    assert_eq!(value["errors"], 1);
    let diagnostics = value["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diagnostics[0]["code"], "link.unresolved");
    assert_eq!(diagnostics[0]["location"]["file"], "step2.html");

    assert!(!dir.path().join("site").exists());
    Ok(())
}

#[test]
fn build_fails_on_duplicate_anchor() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path(), r#"[target name="start"]"#)?;

    #[allow(deprecated)]
    Command::cargo_bin("courseweave")?
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Anchor 'start' defined twice"));
    Ok(())
}

#[test]
fn missing_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    #[allow(deprecated)]
    Command::cargo_bin("courseweave")?
        .current_dir(dir.path())
        .args(["--config", "nope.yml", "verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
    Ok(())
}
