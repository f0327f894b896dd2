//! Integration tests for catalog loading

use securgeek_core::{AppError, Catalog, LessonId, ModuleId};
use std::io::Write;
use std::path::PathBuf;

fn shipped_catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../assets/catalog.toml")
}

#[test]
fn test_shipped_catalog_loads() {
    let catalog = Catalog::load(&shipped_catalog()).expect("shipped catalog must be valid");

    let first = catalog.first_lesson().expect("catalog has lessons");
    assert_eq!(first.id, LessonId::new(1));
    assert_eq!(first.resource_url, "/audios/1.1.mp3");
    assert_eq!(catalog.module_of(first.id).unwrap().id, ModuleId::new(1));
}

#[test]
fn test_every_lesson_has_exactly_one_owner() {
    let catalog = Catalog::load(&shipped_catalog()).unwrap();

    for (module, lesson) in catalog.lessons() {
        let owners = catalog
            .modules()
            .iter()
            .filter(|m| m.contains(lesson.id))
            .count();
        assert_eq!(owners, 1);
        assert_eq!(catalog.module_of(lesson.id).unwrap().id, module.id);
    }
}

#[test]
fn test_malformed_toml_reports_path() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[[modules]]\nid = \"not a number\"").unwrap();

    let err = Catalog::load(file.path()).unwrap_err();
    match err {
        AppError::CatalogParseError { path, .. } => assert_eq!(path, file.path()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_json_and_toml_agree() {
    let toml = r#"
        [[modules]]
        id = 1
        title = "Intro"
        [[modules.lessons]]
        id = 1
        title = "One"
        resource_url = "/audios/1.1.mp3"
    "#;
    let json = r#"{"modules":[{"id":1,"title":"Intro","lessons":[
        {"id":1,"title":"One","resource_url":"/audios/1.1.mp3"}]}]}"#;

    assert_eq!(
        Catalog::from_toml_str(toml).unwrap(),
        Catalog::from_json_str(json).unwrap()
    );
}
