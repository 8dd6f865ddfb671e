// src/driver/tests.rs
//!
//! Tests for the filesystem driver
//!

use super::*;
use crate::entry::EntryKind;
use crate::text::LineEnding;
use std::time::Duration;
use tempfile::TempDir;

fn driver_for(dir: &TempDir) -> Driver {
    Driver::new(DriverConfig::new(dir.path()))
}

fn file_entry(path: &Path) -> Entry {
    Entry::snapshot(path)
}

fn dir_entry(path: &Path) -> Entry {
    let mut entry = Entry::snapshot(path);
    entry.kind = EntryKind::Directory;
    entry
}

fn utf8(line_ending: LineEnding) -> TextParams {
    TextParams {
        charset: "UTF-8".to_string(),
        detect_charset: false,
        line_ending,
    }
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_default_sorts_directories_first() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("zeta.txt"), b"z").unwrap();
    fs::write(dir.path().join("Alpha.txt"), b"a").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let tree = driver_for(&dir).list_default().await.unwrap();
    let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["sub", "Alpha.txt", "zeta.txt"]);
    assert!(tree.root.is_directory());
}

#[tokio::test]
async fn test_list_empty_directory_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let tree = driver_for(&dir).list_default().await.unwrap();
    assert!(tree.children.is_empty());
}

#[tokio::test]
async fn test_list_non_directory_is_directory_expected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    let result = driver_for(&dir)
        .list_children(Some(&file_entry(&file)))
        .await;
    assert!(matches!(
        result,
        Err(DriverError::DirectoryExpected { .. })
    ));
}

#[tokio::test]
async fn test_list_missing_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let ghost = dir_entry(&dir.path().join("ghost"));
    let result = driver_for(&dir).list_children(Some(&ghost)).await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

// ============================================================================
// Create / delete
// ============================================================================

#[tokio::test]
async fn test_create_succeeds_then_already_exists() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let entry = file_entry(&dir.path().join("new.txt"));

    let created = driver.create(&entry).await.unwrap();
    assert_eq!(created.kind, EntryKind::File);

    let again = driver.create(&entry).await;
    assert!(matches!(again, Err(DriverError::AlreadyExists { .. })));
}

#[tokio::test]
async fn test_create_file_builds_missing_parents() {
    let dir = TempDir::new().unwrap();
    let entry = file_entry(&dir.path().join("a/b/c.txt"));

    driver_for(&dir).create(&entry).await.unwrap();
    assert!(dir.path().join("a/b/c.txt").is_file());
}

#[tokio::test]
async fn test_create_directory_chain() {
    let dir = TempDir::new().unwrap();
    let entry = dir_entry(&dir.path().join("x/y/z"));

    let created = driver_for(&dir).create(&entry).await.unwrap();
    assert!(created.is_directory());
    assert!(dir.path().join("x/y/z").is_dir());
}

#[tokio::test]
async fn test_delete_then_properties_is_not_found() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let path = dir.path().join("doomed.txt");
    fs::write(&path, b"bye").unwrap();
    let entry = file_entry(&path);

    let parent = driver.delete(&entry).await.unwrap();
    assert_eq!(parent.as_path(), dir.path());

    let result = driver.properties_of(&entry).await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

#[tokio::test]
async fn test_delete_directory_is_recursive() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("tree");
    fs::create_dir_all(sub.join("deep")).unwrap();
    fs::write(sub.join("deep/leaf.txt"), b"leaf").unwrap();

    driver_for(&dir).delete(&dir_entry(&sub)).await.unwrap();
    assert!(!sub.exists());
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = driver_for(&dir)
        .delete(&file_entry(&dir.path().join("ghost")))
        .await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

// ============================================================================
// Rename
// ============================================================================

#[tokio::test]
async fn test_rename_round_trip_restores_name() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let path = dir.path().join("original.txt");
    fs::write(&path, b"content").unwrap();

    let renamed = driver
        .rename(&file_entry(&path), "renamed.txt")
        .await
        .unwrap();
    assert_eq!(renamed.name, "renamed.txt");

    let restored = driver.rename(&renamed, "original.txt").await.unwrap();
    assert_eq!(restored.name, "original.txt");
    assert_eq!(fs::read(&path).unwrap(), b"content");
}

#[tokio::test]
async fn test_rename_missing_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = driver_for(&dir)
        .rename(&file_entry(&dir.path().join("ghost")), "other")
        .await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

#[tokio::test]
async fn test_rename_onto_existing_sibling_is_already_exists() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let result = driver_for(&dir)
        .rename(&file_entry(&dir.path().join("a.txt")), "b.txt")
        .await;
    assert!(matches!(result, Err(DriverError::AlreadyExists { .. })));
}

// ============================================================================
// Copy
// ============================================================================

#[tokio::test]
async fn test_copy_file_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let src = dir.path().join("src.txt");
    fs::write(&src, b"payload").unwrap();
    let dest = dir.path().join("dest");
    fs::create_dir(&dest).unwrap();

    let copied = driver
        .copy(&file_entry(&src), &dir_entry(&dest))
        .await
        .unwrap();
    assert_eq!(copied.name, "src.txt");
    assert_eq!(fs::read(dest.join("src.txt")).unwrap(), b"payload");

    let again = driver.copy(&file_entry(&src), &dir_entry(&dest)).await;
    assert!(matches!(again, Err(DriverError::AlreadyExists { .. })));
}

#[tokio::test]
async fn test_copy_directory_is_recursive() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("pack");
    fs::create_dir_all(src.join("nested")).unwrap();
    fs::write(src.join("nested/file.txt"), b"deep").unwrap();
    let dest = dir.path().join("dest");
    fs::create_dir(&dest).unwrap();

    driver_for(&dir)
        .copy(&dir_entry(&src), &dir_entry(&dest))
        .await
        .unwrap();
    assert_eq!(fs::read(dest.join("pack/nested/file.txt")).unwrap(), b"deep");
    // Source untouched.
    assert!(src.join("nested/file.txt").exists());
}

#[tokio::test]
async fn test_copy_missing_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dest");
    fs::create_dir(&dest).unwrap();

    let result = driver_for(&dir)
        .copy(&file_entry(&dir.path().join("ghost")), &dir_entry(&dest))
        .await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

// ============================================================================
// Load / save
// ============================================================================

#[tokio::test]
async fn test_save_load_crlf_round_trip_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let path = dir.path().join("doc.txt");
    let entry = file_entry(&path);
    let params = utf8(LineEnding::Crlf);

    driver
        .save(&entry, "one\ntwo\rthree\r\n", &params)
        .await
        .unwrap();
    let first_bytes = fs::read(&path).unwrap();

    let loaded = driver.load(&entry, &params).await.unwrap();
    assert_eq!(loaded, "one\r\ntwo\r\nthree\r\n");

    // Re-saving the loaded result is byte-identical.
    driver.save(&entry, &loaded, &params).await.unwrap();
    assert_eq!(fs::read(&path).unwrap(), first_bytes);
}

#[tokio::test]
async fn test_save_creates_target_and_parents() {
    let dir = TempDir::new().unwrap();
    let entry = file_entry(&dir.path().join("deep/nested/new.txt"));

    driver_for(&dir)
        .save(&entry, "created", &utf8(LineEnding::Lf))
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("deep/nested/new.txt")).unwrap(),
        "created"
    );
}

#[tokio::test]
async fn test_safe_under_concurrent_callers() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let a = file_entry(&dir.path().join("a.txt"));
    let b = file_entry(&dir.path().join("b.txt"));
    let params = utf8(LineEnding::Lf);

    let (saved_a, saved_b) = futures::join!(
        driver.save(&a, "alpha", &params),
        driver.save(&b, "beta", &params)
    );
    saved_a.unwrap();
    saved_b.unwrap();

    let (loaded_a, loaded_b) =
        futures::join!(driver.load(&a, &params), driver.load(&b, &params));
    assert_eq!(loaded_a.unwrap(), "alpha");
    assert_eq!(loaded_b.unwrap(), "beta");
}

#[tokio::test]
async fn test_load_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = driver_for(&dir)
        .load(&file_entry(&dir.path().join("ghost.txt")), &utf8(LineEnding::Lf))
        .await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}

#[tokio::test]
async fn test_load_over_ceiling_is_out_of_memory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.txt");
    fs::write(&path, vec![b'x'; 256]).unwrap();

    let mut config = DriverConfig::new(dir.path());
    config.max_text_bytes = 16;
    let result = Driver::new(config)
        .load(&file_entry(&path), &utf8(LineEnding::Lf))
        .await;
    assert!(matches!(result, Err(DriverError::OutOfMemory { .. })));
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_properties_exact_counting_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counts.txt");
    fs::write(&path, "a b\n\ncd\n").unwrap();

    let props = driver_for(&dir)
        .properties_of(&file_entry(&path))
        .await
        .unwrap();
    assert_eq!(props.line_count, Some(3));
    assert_eq!(props.word_count, Some(3)); // 2 + 0 + 1
    assert_eq!(props.char_count, Some(8)); // raw byte length
    assert!(props.formatted_last_modified.is_some());
    assert_eq!(props.formatted_size, "8 B");
}

#[tokio::test]
async fn test_properties_directory_uses_sentinel() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("folder");
    fs::create_dir(&sub).unwrap();

    let props = driver_for(&dir)
        .properties_of(&dir_entry(&sub))
        .await
        .unwrap();
    assert_eq!(props.line_count, None);
    assert_eq!(props.word_count, None);
    assert_eq!(props.char_count, None);
}

// ============================================================================
// Compress / decompress
// ============================================================================

#[tokio::test]
async fn test_compress_missing_source_scenario() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
    fs::write(dir.path().join("b.txt"), b"beta").unwrap();

    let sources = vec![
        file_entry(&dir.path().join("a.txt")),
        file_entry(&dir.path().join("missing.txt")),
        file_entry(&dir.path().join("b.txt")),
    ];
    let dest = dir_entry(dir.path());

    let mut progress = driver.compress(sources, &dest, "out.zip").await.unwrap();

    // Exactly one progress emission, then the terminal failure.
    let first = progress.next().await.unwrap().unwrap();
    assert_eq!(first.name, "a.txt");
    match progress.next().await.unwrap() {
        Err(DriverError::NotFound { path }) => assert!(path.ends_with("missing.txt")),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(progress.next().await.is_none());

    // The partial archive exists and contains only a.txt.
    let file = std::fs::File::open(dir.path().join("out.zip")).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    assert_eq!(zip.len(), 1);
    assert_eq!(zip.by_index(0).unwrap().name(), "a.txt");
}

#[tokio::test]
async fn test_compress_never_overwrites_existing_archive() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("taken.zip"), b"occupied").unwrap();

    let result = driver_for(&dir)
        .compress(Vec::new(), &dir_entry(dir.path()), "taken.zip")
        .await;
    match result {
        Err(DriverError::AlreadyExists { path }) => assert!(path.ends_with("taken.zip")),
        other => panic!("expected AlreadyExists, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_compress_cancellation_stops_member_processing() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join(name), name.as_bytes()).unwrap();
    }

    let sources = vec![
        file_entry(&dir.path().join("a.txt")),
        file_entry(&dir.path().join("b.txt")),
        file_entry(&dir.path().join("c.txt")),
    ];
    let mut progress = driver
        .compress(sources, &dir_entry(dir.path()), "part.zip")
        .await
        .unwrap();

    assert_eq!(progress.next().await.unwrap().unwrap().name, "a.txt");
    // Cancel by dropping the stream; the producer stops at the next
    // member boundary and finalizes what it already added.
    drop(progress);

    let archive_path = dir.path().join("part.zip");
    let names = wait_for_finalized_archive(&archive_path).await;
    assert!(names.contains(&"a.txt".to_string()));
    assert!(!names.contains(&"c.txt".to_string()));
}

async fn wait_for_finalized_archive(path: &Path) -> Vec<String> {
    for _ in 0..200 {
        if let Ok(file) = std::fs::File::open(path) {
            if let Ok(zip) = zip::ZipArchive::new(file) {
                return zip.file_names().map(String::from).collect();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("archive at {path:?} was never finalized");
}

#[tokio::test]
async fn test_decompress_round_trip() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    fs::write(dir.path().join("a.txt"), b"alpha").unwrap();

    let mut progress = driver
        .compress(
            vec![file_entry(&dir.path().join("a.txt"))],
            &dir_entry(dir.path()),
            "roundtrip.zip",
        )
        .await
        .unwrap();
    assert!(progress.next().await.unwrap().is_ok());
    assert!(progress.next().await.is_none());

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let source = file_entry(&dir.path().join("roundtrip.zip"));
    let returned = driver.decompress(&source, &dir_entry(&out)).await.unwrap();
    assert_eq!(returned.path, source.path);
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"alpha");
}

#[tokio::test]
async fn test_decompress_unrecognized_suffix_regardless_of_existence() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(&dir);
    let dest = dir_entry(dir.path());

    // Existing file with the wrong suffix.
    fs::write(dir.path().join("data.tar"), b"tar tar").unwrap();
    let result = driver
        .decompress(&file_entry(&dir.path().join("data.tar")), &dest)
        .await;
    assert!(matches!(
        result,
        Err(DriverError::UnsupportedArchiveFormat { .. })
    ));

    // Missing file with the wrong suffix: same error, existence unchecked.
    let result = driver
        .decompress(&file_entry(&dir.path().join("ghost.rar")), &dest)
        .await;
    assert!(matches!(
        result,
        Err(DriverError::UnsupportedArchiveFormat { .. })
    ));
}

#[tokio::test]
async fn test_decompress_missing_archive_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = driver_for(&dir)
        .decompress(
            &file_entry(&dir.path().join("ghost.zip")),
            &dir_entry(dir.path()),
        )
        .await;
    assert!(matches!(result, Err(DriverError::NotFound { .. })));
}
