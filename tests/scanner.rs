use sketchport::core::scanner::FileScanner;
use sketchport::parsers::UnitRole;
use std::fs;
use std::path::Path;

fn touch<P: AsRef<Path>>(p: P) {
    fs::write(p, "// test").unwrap();
}

#[test]
fn scanner_lists_main_sketch_first_then_by_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();

    touch(root.join("zeta.cpp"));
    touch(root.join("alpha.ino"));
    touch(root.join("Blink.ino"));
    touch(root.join("helpers.h"));
    touch(root.join("readme.txt")); // ignored

    let files = FileScanner::new().scan_directory(root, "Blink").unwrap();

    let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["Blink.ino", "alpha.ino", "helpers.h", "zeta.cpp"]);

    let roles: Vec<_> = files.iter().map(|f| f.role).collect();
    assert_eq!(
        roles,
        vec![UnitRole::Sketch, UnitRole::Sketch, UnitRole::Header, UnitRole::Source]
    );
}

#[test]
fn scanner_does_not_descend_into_subfolders() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("PlatformIO/Blink/src")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    touch(root.join("Blink.ino"));
    touch(root.join("PlatformIO/Blink/src/Blink.cpp"));
    touch(root.join("data/index.h"));

    let files = FileScanner::new().scan_directory(root, "Blink").unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name, "Blink.ino");
}

#[test]
fn scanner_reports_missing_folder() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(FileScanner::new().scan_directory(&missing, "nope").is_err());
}
