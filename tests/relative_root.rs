//! Relative source and root paths
//!
//! Changes the working directory, so it lives in its own test binary.

use std::env;
use std::fs;
use std::io::Cursor;

use lambda_pack::{add_to_archive, ArchiveListing};
use tempfile::TempDir;
use zip::ZipWriter;

#[test]
fn test_relative_tree_with_relative_root() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("tree/sub")).unwrap();
    fs::write(dir.path().join("tree/a.txt"), "alpha").unwrap();
    fs::write(dir.path().join("tree/sub/b.txt"), "bravo").unwrap();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let mut stripped = ZipWriter::new(Cursor::new(Vec::new()));
    let stripped_result = add_to_archive(&mut stripped, "./tree", "tree");

    let mut namespaced = ZipWriter::new(Cursor::new(Vec::new()));
    let namespaced_result = add_to_archive(&mut namespaced, "./tree", "site");

    env::set_current_dir(previous).unwrap();
    stripped_result.unwrap();
    namespaced_result.unwrap();

    let bytes = stripped.finish().unwrap().into_inner();
    let listing = ArchiveListing::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(listing.paths(), vec!["a.txt", "sub/", "sub/b.txt"]);
    for entry in &listing.entries {
        assert!(!entry.path.contains('\\'));
    }

    let bytes = namespaced.finish().unwrap().into_inner();
    let listing = ArchiveListing::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(
        listing.paths(),
        vec!["site/", "site/a.txt", "site/sub/", "site/sub/b.txt"]
    );
}
