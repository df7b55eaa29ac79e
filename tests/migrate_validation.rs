use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use store_shift::{MigrateError, Settings, engine};

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

fn assert_no_artifacts(parent: &Path) {
    assert!(!parent.join("data.lock").exists(), "no lock may be created");
    assert!(
        !parent.join("data.migrating").exists(),
        "no staging tree may be created"
    );
    assert!(!parent.join("data").exists(), "no destination may appear");
}

#[test]
#[serial]
fn existing_destination_is_rejected_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;
    fs::write(settings.storage_path.join("payload.txt"), b"p")?;

    let parent = base.join("parent");
    let occupied = parent.join("data");
    fs::create_dir_all(&occupied)?;
    fs::write(occupied.join("precious.txt"), b"keep me")?;

    let err = engine::migrate(&mut settings, &parent, &mut |_| {}).unwrap_err();
    assert!(matches!(err, MigrateError::Validation { .. }));
    assert_eq!(fs::read(occupied.join("precious.txt"))?, b"keep me");
    assert!(!parent.join("data.lock").exists());
    assert!(!parent.join("data.migrating").exists());

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn destination_nested_under_source_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;
    let inner = settings.storage_path.join("inner");
    fs::create_dir(&inner)?;

    let err = engine::migrate(&mut settings, &inner, &mut |_| {}).unwrap_err();
    match err {
        MigrateError::Validation { reason, .. } => {
            assert!(reason.contains("inside the current data directory"), "{reason}");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_no_artifacts(&inner);

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn missing_destination_parent_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;

    let err = engine::migrate(&mut settings, &base.join("nowhere"), &mut |_| {}).unwrap_err();
    assert!(matches!(err, MigrateError::Validation { .. }));

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn stale_lock_at_destination_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    fs::create_dir_all(&settings.storage_path)?;

    let parent = base.join("parent");
    fs::create_dir(&parent)?;
    fs::write(parent.join("data.lock"), b"migration in progress\n")?;

    let err = engine::migrate(&mut settings, &parent, &mut |_| {}).unwrap_err();
    match err {
        MigrateError::Validation { reason, .. } => {
            assert!(reason.contains("interrupted"), "{reason}");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(!parent.join("data").exists());
    assert!(!parent.join("data.migrating").exists());

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}

#[test]
#[serial]
fn missing_source_is_rejected_before_any_probe() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let base = fs::canonicalize(td.path())?;
    let mut settings = pinned_settings(&base);
    // storage_path deliberately not created

    let parent = base.join("parent");
    fs::create_dir(&parent)?;

    let err = engine::migrate(&mut settings, &parent, &mut |_| {}).unwrap_err();
    assert!(matches!(err, MigrateError::Validation { .. }));
    assert_no_artifacts(&parent);

    unsafe {
        std::env::remove_var("STORE_SHIFT_CONFIG");
    }
    Ok(())
}
