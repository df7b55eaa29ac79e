use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use store_shift::Settings;
use store_shift::engine;

/// Pin the config file into the test's temp dir and build settings whose
/// storage path lives there too.
fn pinned_settings(base: &Path) -> Settings {
    let cfg = base.join("config.xml");
    unsafe {
        std::env::set_var("STORE_SHIFT_CONFIG", &cfg);
    }
    Settings {
        storage_path: base.join("data"),
        previous_path: None,
        migrate_parent: None,
        log_file: None,
        ..Settings::default()
    }
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
#[serial]
fn migrates_tree_and_reports_single_terminal_hundred() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);

    // Source: three payload files (one empty) plus a stray lock that must
    // be excluded from sizing and never copied.
    let src = settings.storage_path.clone();
    fs::create_dir_all(src.join("sub"))?;
    let big = patterned(300_000);
    let mid = patterned(150_000);
    fs::write(src.join("big.bin"), &big)?;
    fs::write(src.join("sub/mid.bin"), &mid)?;
    fs::write(src.join("empty.bin"), b"")?;
    fs::write(src.join("x.lock"), patterned(1_000_000))?;

    assert_eq!(engine::directory_size(&src)?, 450_000);

    let dest_parent = base.join("new-home");
    fs::create_dir(&dest_parent)?;

    let mut events: Vec<u8> = Vec::new();
    let outcome = engine::migrate(&mut settings, &dest_parent, &mut |p| events.push(p))?;

    let new_path = dest_parent.join("data");
    assert_eq!(outcome.old_path, src);
    assert_eq!(outcome.new_path, new_path);

    // Destination holds exactly the payload, byte for byte.
    assert_eq!(fs::read(new_path.join("big.bin"))?, big);
    assert_eq!(fs::read(new_path.join("sub/mid.bin"))?, mid);
    assert_eq!(fs::metadata(new_path.join("empty.bin"))?.len(), 0);
    assert!(!new_path.join("x.lock").exists(), "markers are not payload");

    // Source is untouched.
    assert_eq!(fs::read(src.join("big.bin"))?, big);
    assert_eq!(fs::read(src.join("sub/mid.bin"))?, mid);
    assert!(src.join("x.lock").exists());

    // No artifacts survive a clean commit.
    assert!(!dest_parent.join("data.migrating").exists());
    assert!(!dest_parent.join("data.lock").exists());

    // Progress: starts at 0, monotonic, capped at 99 until the single
    // terminal 100 after the commit.
    assert_eq!(events.first(), Some(&0));
    assert!(events.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(events.iter().filter(|&&p| p == 100).count(), 1);
    assert_eq!(events.last(), Some(&100));
    assert!(events[..events.len() - 1].iter().all(|&p| p <= 99));

    // Settings were updated and persisted.
    assert_eq!(settings.storage_path, new_path);
    assert_eq!(settings.previous_path.as_deref(), Some(src.as_path()));
    assert_eq!(
        settings.migrate_parent.as_deref(),
        Some(dest_parent.as_path())
    );
    let reloaded = store_shift::config::load_settings(&base.join("config.xml"))?;
    assert_eq!(reloaded.storage_path, new_path);
    assert_eq!(reloaded.previous_path, Some(src.clone()));

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn empty_source_completes_without_division_errors() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;
    let dest_parent = base.join("elsewhere");
    fs::create_dir(&dest_parent)?;

    let mut events: Vec<u8> = Vec::new();
    let outcome = engine::migrate(&mut settings, &dest_parent, &mut |p| events.push(p))?;

    assert_eq!(events, vec![0, 99, 100]);
    assert!(outcome.new_path.is_dir());
    assert!(!dest_parent.join("data.migrating").exists());
    assert!(!dest_parent.join("data.lock").exists());

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn second_migration_validates_against_the_new_location()
-> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;
    fs::write(settings.storage_path.join("k.txt"), b"v")?;

    let first_parent = base.join("first");
    fs::create_dir(&first_parent)?;
    engine::migrate(&mut settings, &first_parent, &mut |_| {})?;
    let new_home = first_parent.join("data");
    assert_eq!(settings.storage_path, new_home);

    // A destination nested under the *current* (post-migration) storage
    // directory must now be rejected.
    let nested = new_home.join("deeper");
    fs::create_dir(&nested)?;
    let err = engine::migrate(&mut settings, &nested, &mut |_| {}).unwrap_err();
    assert!(matches!(
        err,
        store_shift::MigrateError::Validation { .. }
    ));
    assert!(!nested.join("data.lock").exists());
    assert!(!nested.join("data.migrating").exists());

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
fn reported_bytes_never_exceed_total() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let src = base.join("data");
    fs::create_dir_all(&src)?;
    for i in 0..20 {
        fs::write(src.join(format!("f{i}.bin")), patterned(10_000 + i))?;
    }
    let total = engine::directory_size(&src)?;

    let mut copied: u64 = 0;
    let mut last: u64 = 0;
    engine::copy_tree(&src, &base.join("staged"), &mut |d| {
        copied += d;
        assert!(copied >= last, "byte accounting must be non-decreasing");
        last = copied;
    })?;
    assert_eq!(copied, total);
    Ok(())
}
