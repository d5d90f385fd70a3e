use library_organizer::error::OrganizerError;
use library_organizer::library::Library;
use library_organizer::watcher::handler::{LibraryReconciler, Outcome};
use library_organizer::watcher::service::OrganizerService;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing_test::traced_test;

struct Fixture {
    tmpdir: TempDir,
    watch: PathBuf,
    library: PathBuf,
    service: OrganizerService,
}

/// Helper: a watched root and an empty library on the same volume.
fn fixture() -> Result<Fixture, OrganizerError> {
    let tmpdir = TempDir::new()?;
    let watch = tmpdir.path().join("watch");
    let library = tmpdir.path().join("library");
    fs::create_dir(&watch)?;
    fs::create_dir(&library)?;

    let mut service = OrganizerService::new(LibraryReconciler::new(Library::open(&library)?));
    service.watch(&[&watch])?;

    Ok(Fixture {
        tmpdir,
        watch,
        library,
        service,
    })
}

#[test]
fn created_file_is_linked_after_pump() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let source = fx.watch.join("Show.Name.S01E01.mkv");
    fs::write(&source, "episode")?;

    assert!(fx.service.pump()? >= 1);

    let entry = fx.library.join("show name/Show.Name.S01E01.mkv");
    assert!(entry.is_file());
    assert_eq!(fs::metadata(&entry)?.ino(), fs::metadata(&source)?.ino());

    Ok(())
}

#[test]
fn pump_without_events_returns_zero() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;

    assert_eq!(fx.service.pump()?, 0);

    Ok(())
}

#[test]
fn deleting_last_episode_removes_series_dir() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let source = fx.watch.join("Star.Trek.Strange.New.Worlds.S01E02.mkv");
    fs::write(&source, "episode")?;
    fx.service.pump()?;

    let series_dir = fx.library.join("star trek strange new worlds");
    assert!(series_dir.join("Star.Trek.Strange.New.Worlds.S01E02.mkv").is_file());

    fs::remove_file(&source)?;
    fx.service.pump()?;

    assert!(!series_dir.exists());

    Ok(())
}

#[test]
fn moved_in_and_out_files_are_tracked() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let staging = fx.tmpdir.path().join("staging");
    fs::create_dir(&staging)?;
    let staged = staging.join("Show.Name.S02E01.mkv");
    fs::write(&staged, "episode")?;

    let arrived = fx.watch.join("Show.Name.S02E01.mkv");
    fs::rename(&staged, &arrived)?;
    fx.service.pump()?;
    assert!(fx.library.join("show name/Show.Name.S02E01.mkv").is_file());

    fs::rename(&arrived, &staged)?;
    fx.service.pump()?;
    assert!(!fx.library.join("show name").exists());

    Ok(())
}

#[test]
fn non_media_file_never_creates_series_dir() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    fs::write(fx.watch.join("Show.Name.S01E01.jpg"), "art")?;
    fs::write(fx.watch.join("Show.Name.S01E01.nfo"), "info")?;

    fx.service.pump()?;

    assert_eq!(fs::read_dir(&fx.library)?.count(), 0);

    Ok(())
}

#[test]
fn empty_episode_folder_is_linked_when_payload_arrives() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let folder = fx.watch.join("Show.Name.S01E04");
    fs::create_dir(&folder)?;
    fx.service.pump()?;
    assert_eq!(fs::read_dir(&fx.library)?.count(), 0);
    assert!(fx.service.is_awaiting_payload(&folder));

    fs::write(folder.join("Show.Name.S01E04.mkv"), "episode")?;
    fx.service.pump()?;

    assert!(fx.library.join("show name/Show.Name.S01E04.mkv").is_file());
    assert!(!fx.service.is_awaiting_payload(&folder));

    Ok(())
}

#[test]
fn deleting_episode_folder_unlinks_payload() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let folder = fx.watch.join("Show.Name.S01E05");
    fs::create_dir(&folder)?;
    fs::write(folder.join("Show.Name.S01E05.mkv"), "episode")?;
    fx.service.pump()?;
    assert!(fx.library.join("show name/Show.Name.S01E05.mkv").is_file());

    fs::remove_dir_all(&folder)?;
    fx.service.pump()?;

    assert!(!fx.library.join("show name").exists());

    Ok(())
}

#[test]
fn rewatching_replaces_previous_roots() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let other = fx.tmpdir.path().join("other");
    fs::create_dir(&other)?;

    fx.service.watch(&[&other])?;
    assert_eq!(fx.service.roots(), &[other.clone()]);

    fs::write(fx.watch.join("Old.Root.S01E01.mkv"), "ignored")?;
    fs::write(other.join("New.Root.S01E01.mkv"), "linked")?;
    fx.service.pump()?;

    assert!(!fx.library.join("old root").exists());
    assert!(fx.library.join("new root/New.Root.S01E01.mkv").is_file());

    Ok(())
}

#[test]
fn watching_missing_root_fails() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    let missing = fx.tmpdir.path().join("missing");

    let result = fx.service.watch(&[&missing]);

    assert!(matches!(result, Err(OrganizerError::Watch(_))));
    assert!(!fx.service.is_watching());

    Ok(())
}

#[test]
fn unwatched_service_is_inert() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    fx.service.unwatch()?;
    fs::write(fx.watch.join("Show.Name.S01E01.mkv"), "episode")?;

    assert_eq!(fx.service.pump()?, 0);
    fx.service.run()?;
    assert_eq!(fs::read_dir(&fx.library)?.count(), 0);

    Ok(())
}

#[test]
fn sync_links_existing_and_prunes_stale() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    fs::write(fx.watch.join("Show.Name.S01E01.mkv"), "present")?;
    let stale_dir = fx.library.join("gone show");
    fs::create_dir(&stale_dir)?;
    fs::write(stale_dir.join("Gone.Show.S01E01.mkv"), "stale")?;

    let roots = vec![fx.watch.clone()];
    let outcomes = fx.service.sync(&roots)?;

    assert!(outcomes.iter().any(|o| matches!(o, Outcome::Linked { .. })));
    assert!(fx.library.join("show name/Show.Name.S01E01.mkv").is_file());
    assert!(!stale_dir.exists());
    assert_eq!(
        fx.service.reconciler().library().series()?,
        vec![fx.library.join("show name")]
    );

    // the create event from the write above is now already satisfied
    fx.service.pump()?;
    assert_eq!(fs::read_dir(fx.library.join("show name"))?.count(), 1);

    Ok(())
}

#[test]
#[traced_test]
fn unparseable_names_are_logged_as_warnings() -> Result<(), OrganizerError> {
    let mut fx = fixture()?;
    fs::write(fx.watch.join("cover.jpg"), "art")?;

    fx.service.pump()?;

    assert!(logs_contain("Could not parse series name"));
    assert_eq!(fs::read_dir(&fx.library)?.count(), 0);

    Ok(())
}
