//! Fixers applied to a copy of the fixture project.

use std::fs;
use std::path::{Path, PathBuf};

use gdscan::fix;
use gdscan::{Config, Project};
use tempfile::TempDir;
use walkdir::WalkDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn copy_fixture() -> TempDir {
    let src = testdata_path().join("keyboard_defense");
    let temp = TempDir::new().unwrap();
    for entry in WalkDir::new(&src).into_iter().filter_map(Result::ok) {
        let rel = entry.path().strip_prefix(&src).unwrap();
        let dest = temp.path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    temp
}

fn load(root: &Path) -> Project {
    Project::load(root, Config::load_for_root(root, None).unwrap()).unwrap()
}

#[test]
fn test_dict_access_fix_is_idempotent() {
    let temp = copy_fixture();
    let fixer = fix::find("dict-access").unwrap();

    let first = fix::apply(&load(temp.path()), fixer.as_ref(), None, false).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].file, "ui/hud.gd");
    let hud = fs::read_to_string(temp.path().join("ui/hud.gd")).unwrap();
    assert!(hud.contains("enemy.get(\"damage\", 0)"));

    let second = fix::apply(&load(temp.path()), fixer.as_ref(), None, false).unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_unused_preload_fix() {
    let temp = copy_fixture();
    let fixer = fix::find("unused_preloads").unwrap();
    let before = fs::read_to_string(temp.path().join("game/battlefield.gd")).unwrap();

    let dry = fix::apply(&load(temp.path()), fixer.as_ref(), Some("game/battlefield.gd"), true).unwrap();
    assert_eq!(dry.len(), 1);
    assert_eq!(dry[0].changes.len(), 1);
    assert_eq!(dry[0].changes[0].line, 4);
    assert!(dry[0].changes[0].after.is_none());
    assert_eq!(fs::read_to_string(temp.path().join("game/battlefield.gd")).unwrap(), before);

    fix::apply(&load(temp.path()), fixer.as_ref(), None, false).unwrap();
    let after = fs::read_to_string(temp.path().join("game/battlefield.gd")).unwrap();
    assert!(!after.contains("Projectile"));
    assert!(after.contains("GameStateScript"));
    assert!(fix::apply(&load(temp.path()), fixer.as_ref(), None, false).unwrap().is_empty());
}

#[test]
fn test_fix_unknown_file_errors() {
    let temp = copy_fixture();
    let fixer = fix::find("dict-access").unwrap();
    assert!(fix::apply(&load(temp.path()), fixer.as_ref(), Some("missing.gd"), true).is_err());
}
