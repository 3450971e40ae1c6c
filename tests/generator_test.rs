use std::fs;
use std::path::{Path, PathBuf};

use ritual::error::Error;
use ritual::generator::{
    is_rendered_path_valid, strip_template_suffix, template_suffix, FileAction, FileGenerator,
    MappingKind,
};
use ritual::manifest::{DirectoryMapping, FileMapping, Files};
use ritual::renderer::MiniJinjaRenderer;
use ritual::variables::VariableStore;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn variables() -> VariableStore {
    let mut variables = VariableStore::new();
    variables.insert("app_name", "demo-app");
    variables.insert("use_db", false);
    variables.insert("db_type", "postgres");
    variables
}

/// A workspace holding `recipe/` and `out/` side by side.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn recipe(&self) -> PathBuf {
        self.dir.path().join("recipe")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn template(&self, name: &str, content: &str) {
        write(&self.recipe().join("templates").join(name), content);
    }

    fn static_file(&self, name: &str, content: &str) {
        write(&self.recipe().join("static").join(name), content);
    }
}

#[test_log::test]
fn test_renders_templates_and_skips_false_conditions() {
    let ws = Workspace::new();
    ws.template("README.md.tmpl", "# [[ app_name ]]\n");
    ws.template("db.sql", "-- [[ db_type ]]\n");
    ws.template("main.rs", "mod [[ app_name | snake_case ]];\n");

    let files = Files {
        templates: vec![
            FileMapping::new("README.md.tmpl"),
            FileMapping { condition: Some("use_db".to_string()), ..FileMapping::new("db.sql") },
            FileMapping::new("main.rs").to("src/[[ app_name | snake_case ]].rs"),
        ],
        ..Files::default()
    };

    let renderer = MiniJinjaRenderer::new();
    let generator = FileGenerator::new(&renderer, ws.recipe(), ws.out());
    let generated = generator.generate_files(&files, &variables()).unwrap();

    let actions: Vec<FileAction> = generated.iter().map(|g| g.action).collect();
    assert_eq!(
        actions,
        vec![FileAction::Written, FileAction::SkippedCondition, FileAction::Written]
    );
    assert_eq!(fs::read_to_string(ws.out().join("README.md")).unwrap(), "# demo-app\n");
    assert_eq!(fs::read_to_string(ws.out().join("src/demo_app.rs")).unwrap(), "mod demo_app;\n");
    assert!(!ws.out().join("db.sql").exists());
    assert_eq!(generated[1].target, None);
}

#[test]
fn test_condition_can_enable_a_mapping() {
    let ws = Workspace::new();
    ws.template("db.sql", "-- [[ db_type ]]\n");

    let files = Files {
        templates: vec![FileMapping {
            condition: Some("use_db && db_type == 'postgres'".to_string()),
            ..FileMapping::new("db.sql")
        }],
        ..Files::default()
    };
    let mut vars = variables();
    vars.insert("use_db", true);

    let renderer = MiniJinjaRenderer::new();
    FileGenerator::new(&renderer, ws.recipe(), ws.out()).generate_files(&files, &vars).unwrap();
    assert_eq!(fs::read_to_string(ws.out().join("db.sql")).unwrap(), "-- postgres\n");
}

#[test]
fn test_directory_source_is_walked() {
    let ws = Workspace::new();
    ws.template("service/[[ app_name ]]/main.rs.j2", "// [[ app_name ]]\n");
    ws.template("service/Cargo.toml.tpl", "name = \"[[ app_name ]]\"\n");
    ws.template("service/plain.txt", "plain\n");
    ws.template("service/.DS_Store", "junk");
    ws.template("service/notes.bak", "junk");

    let files = Files {
        templates: vec![FileMapping::new("service").to("app")],
        ignore: vec!["*.bak".to_string()],
        ..Files::default()
    };

    let renderer = MiniJinjaRenderer::new();
    let generated = FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();
    assert_eq!(generated.len(), 3);
    assert!(generated.iter().all(|g| g.action == FileAction::Written));

    let expected = ws.dir.path().join("expected");
    write(&expected.join("demo-app/main.rs"), "// demo-app\n");
    write(&expected.join("Cargo.toml"), "name = \"demo-app\"\n");
    write(&expected.join("plain.txt"), "plain\n");
    assert!(!dir_diff::is_different(ws.out().join("app"), &expected).unwrap());
}

#[test]
fn test_static_files_are_copied_verbatim() {
    let ws = Workspace::new();
    ws.static_file("assets/logo.txt", "[[ not rendered ]]");
    ws.static_file("assets/nested/data.bin", "raw");

    let files = Files {
        static_files: vec![FileMapping::new("assets")],
        ..Files::default()
    };
    let renderer = MiniJinjaRenderer::new();
    let generated = FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    assert!(generated.iter().all(|g| g.action == FileAction::Copied));
    assert!(!dir_diff::is_different(ws.recipe().join("static/assets"), ws.out().join("assets"))
        .unwrap());
}

#[cfg(unix)]
#[test]
fn test_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    ws.template("config.toml", "secret = true\n");
    ws.static_file("run.sh", "#!/bin/sh\n");
    let script = ws.recipe().join("static/run.sh");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let files = Files {
        templates: vec![FileMapping::new("config.toml")],
        static_files: vec![FileMapping::new("run.sh")],
        ..Files::default()
    };
    let renderer = MiniJinjaRenderer::new();
    FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    let mode = |path: PathBuf| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(ws.out().join("config.toml")), 0o600);
    assert_eq!(mode(ws.out().join("run.sh")), 0o755);
}

#[cfg(unix)]
#[test]
fn test_overwritten_file_permissions_are_narrowed() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    ws.template("config.toml", "secret = [[ app_name ]]\n");
    let target = ws.out().join("config.toml");
    write(&target, "old\n");
    fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

    let files = Files { templates: vec![FileMapping::new("config.toml")], ..Files::default() };
    let renderer = MiniJinjaRenderer::new();
    FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    assert_eq!(fs::metadata(&target).unwrap().permissions().mode() & 0o777, 0o600);
    assert_eq!(fs::read_to_string(&target).unwrap(), "secret = demo-app\n");
}

#[test]
fn test_protected_files_are_kept() {
    let ws = Workspace::new();
    ws.template("config.toml", "generated\n");
    ws.template("settings/local.toml", "generated\n");
    ws.template("fresh.toml", "generated\n");
    write(&ws.out().join("config.toml"), "ORIGINAL");
    write(&ws.out().join("settings/local.toml"), "ORIGINAL");

    let files = Files {
        templates: vec![
            FileMapping { protected: true, ..FileMapping::new("config.toml") },
            FileMapping::new("settings/local.toml"),
            FileMapping { protected: true, ..FileMapping::new("fresh.toml") },
        ],
        protected: vec!["settings/*.toml".to_string()],
        ..Files::default()
    };
    let renderer = MiniJinjaRenderer::new();
    let generated = FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    let actions: Vec<FileAction> = generated.iter().map(|g| g.action).collect();
    assert_eq!(
        actions,
        vec![FileAction::SkippedProtected, FileAction::SkippedProtected, FileAction::Written]
    );
    assert_eq!(fs::read_to_string(ws.out().join("config.toml")).unwrap(), "ORIGINAL");
    assert_eq!(fs::read_to_string(ws.out().join("settings/local.toml")).unwrap(), "ORIGINAL");
    assert_eq!(fs::read_to_string(ws.out().join("fresh.toml")).unwrap(), "generated\n");
}

#[test]
fn test_optional_missing_source_is_skipped() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.recipe()).unwrap();

    let files = Files {
        templates: vec![FileMapping { optional: true, ..FileMapping::new("maybe.txt") }],
        ..Files::default()
    };
    let renderer = MiniJinjaRenderer::new();
    let generated = FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].action, FileAction::SkippedMissing);
    assert!(!ws.out().join("maybe.txt").exists());
}

#[test]
fn test_missing_source_is_an_error() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.recipe()).unwrap();

    let files = Files { templates: vec![FileMapping::new("absent.txt")], ..Files::default() };
    let renderer = MiniJinjaRenderer::new();
    let result =
        FileGenerator::new(&renderer, ws.recipe(), ws.out()).generate_files(&files, &variables());

    match result {
        Err(Error::SourceNotFound { path }) => assert!(path.ends_with("absent.txt")),
        other => panic!("expected SourceNotFound, got {other:?}"),
    }
}

#[test]
fn test_shared_sources() {
    let ws = Workspace::new();
    write(&ws.dir.path().join("_shared/LICENSE.tmpl"), "(c) [[ app_name ]]\n");
    let library = ws.dir.path().join("library");
    write(&library.join("ci.yml"), "name: [[ app_name ]]\n");
    fs::create_dir_all(ws.recipe()).unwrap();

    let renderer = MiniJinjaRenderer::new();
    let files = Files {
        templates: vec![FileMapping::new("_shared:LICENSE.tmpl")],
        ..Files::default()
    };
    FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();
    assert_eq!(fs::read_to_string(ws.out().join("LICENSE")).unwrap(), "(c) demo-app\n");

    let files = Files {
        templates: vec![FileMapping::new("_shared:ci.yml").to(".ci/build.yml")],
        ..Files::default()
    };
    let generator =
        FileGenerator::new(&renderer, ws.recipe(), ws.out()).with_shared_root(&library);
    generator.generate_files(&files, &variables()).unwrap();
    assert_eq!(fs::read_to_string(ws.out().join(".ci/build.yml")).unwrap(), "name: demo-app\n");
}

#[test]
fn test_resolve_source() {
    let renderer = MiniJinjaRenderer::new();
    let generator = FileGenerator::new(&renderer, "/recipes/web", "/tmp/out");

    assert_eq!(
        generator.resolve_source(MappingKind::Template, "src/main.rs").unwrap(),
        PathBuf::from("/recipes/web/templates/src/main.rs")
    );
    assert_eq!(
        generator.resolve_source(MappingKind::Static, "logo.png").unwrap(),
        PathBuf::from("/recipes/web/static/logo.png")
    );
    assert_eq!(
        generator.resolve_source(MappingKind::Static, "_shared:logo.png").unwrap(),
        PathBuf::from("/recipes/_shared/logo.png")
    );
}

#[test]
fn test_directories_are_created() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.recipe()).unwrap();

    let files = Files {
        directories: vec![
            DirectoryMapping { path: "logs".to_string(), condition: None },
            DirectoryMapping {
                path: "[[ app_name ]]/migrations".to_string(),
                condition: Some("use_db".to_string()),
            },
            DirectoryMapping { path: "[[ app_name ]]/data".to_string(), condition: None },
        ],
        ..Files::default()
    };
    let renderer = MiniJinjaRenderer::new();
    let generated = FileGenerator::new(&renderer, ws.recipe(), ws.out())
        .generate_files(&files, &variables())
        .unwrap();

    let actions: Vec<FileAction> = generated.iter().map(|g| g.action).collect();
    assert_eq!(
        actions,
        vec![
            FileAction::CreatedDirectory,
            FileAction::SkippedCondition,
            FileAction::CreatedDirectory
        ]
    );
    assert!(ws.out().join("logs").is_dir());
    assert!(ws.out().join("demo-app/data").is_dir());
    assert!(!ws.out().join("demo-app/migrations").exists());
}

#[test]
fn test_invalid_destinations_are_rejected() {
    let ws = Workspace::new();
    ws.template("a.txt", "a");
    let renderer = MiniJinjaRenderer::new();
    let mut vars = variables();
    vars.insert("empty", "");

    for destination in ["../escape.txt", "/etc/passwd", "dir//a.txt", "[[ empty ]]"] {
        let files = Files {
            templates: vec![FileMapping::new("a.txt").to(destination)],
            ..Files::default()
        };
        let result =
            FileGenerator::new(&renderer, ws.recipe(), ws.out()).generate_files(&files, &vars);
        assert!(
            matches!(result, Err(Error::InvalidDestination { .. })),
            "destination {destination:?} should be rejected"
        );
    }
}

#[test]
fn test_undefined_variable_in_template_fails() {
    let ws = Workspace::new();
    ws.template("a.txt", "[[ nope ]]");
    let renderer = MiniJinjaRenderer::new();
    let files = Files { templates: vec![FileMapping::new("a.txt")], ..Files::default() };

    let result =
        FileGenerator::new(&renderer, ws.recipe(), ws.out()).generate_files(&files, &variables());
    assert!(matches!(result, Err(Error::RenderError { .. })));
    assert!(!ws.out().join("a.txt").exists());
}

#[test]
fn test_template_suffix_helpers() {
    assert_eq!(template_suffix("main.rs.tmpl"), Some(".tmpl"));
    assert_eq!(template_suffix("index.html.j2"), Some(".j2"));
    assert_eq!(template_suffix("a.tpl"), Some(".tpl"));
    assert_eq!(template_suffix(".tmpl"), None);
    assert_eq!(template_suffix("main.rs"), None);

    assert_eq!(strip_template_suffix("src/main.rs.tmpl"), PathBuf::from("src/main.rs"));
    assert_eq!(strip_template_suffix("src/main.rs"), PathBuf::from("src/main.rs"));
}

#[test]
fn test_is_rendered_path_valid() {
    assert!(!is_rendered_path_valid(""));
    assert!(!is_rendered_path_valid("   "));
    assert!(!is_rendered_path_valid("output//filename.txt"));
    assert!(!is_rendered_path_valid("/filename.txt"));
    assert!(!is_rendered_path_valid("../filename.txt"));
    assert!(!is_rendered_path_valid("a/../../b"));
    assert!(is_rendered_path_valid("filename.txt"));
    assert!(is_rendered_path_valid("output/filename.txt"));
    assert!(is_rendered_path_valid("./output/filename.txt"));
}
