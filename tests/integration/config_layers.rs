//! Repository configuration files feeding the version graph

use super::test_utils::{noise, paint};
use std::fs;
use tempfile::TempDir;
use tessera::commitment::OddNodePolicy;
use tessera::config::repository_config_path;
use tessera::{CommitOptions, ConfigLoader, RepoError, Repository, TesseraConfig};

#[test]
fn test_init_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let path = repository_config_path(dir.path());
    assert!(path.exists());
    assert_eq!(ConfigLoader::load_from_file(&path).unwrap(), TesseraConfig::default());
    assert_eq!(repo.config().region.max_depth, 8);
}

#[test]
fn test_init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    let path = repository_config_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "[region]\nmin_size = 2\n").unwrap();

    let repo = Repository::init(dir.path()).unwrap();
    assert_eq!(repo.config().region.min_size, 2);
    assert_eq!(fs::read_to_string(&path).unwrap(), "[region]\nmin_size = 2\n");
}

#[test]
fn test_repository_file_shapes_fingerprints() {
    let dir = TempDir::new().unwrap();
    let path = repository_config_path(dir.path());
    let mut config = TesseraConfig::default();
    config.region.max_depth = 3;
    config.region.min_size = 4;
    config.commitment.odd_node = OddNodePolicy::Duplicate;
    ConfigLoader::write(&config, &path).unwrap();

    let mut repo = Repository::init(dir.path()).unwrap();
    assert_eq!(repo.config(), &config);
    assert_eq!(repo.graph().settings().odd_node, OddNodePolicy::Duplicate);

    repo.stage_image(noise(64, 64, 8)).unwrap();
    let id = repo.commit("shallow", &CommitOptions::default()).unwrap();
    // Depth 3 caps a 64x64 image at 8x8 leaves.
    assert_eq!(repo.version(&id).unwrap().leaf_count, 64);
}

#[test]
fn test_merge_settings_from_file() {
    let dir = TempDir::new().unwrap();
    let path = repository_config_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "[merge]\nconflict_color = [0, 0, 0]\n").unwrap();

    let mut repo = Repository::init(dir.path()).unwrap();
    let base = tessera::Raster::filled(8, 8, &[100, 100, 100]).unwrap();
    repo.stage_image(base.clone()).unwrap();
    repo.commit("base", &CommitOptions::default()).unwrap();
    repo.create_branch("other", None, "").unwrap();

    let mut ours = base.clone();
    paint(&mut ours, 0, 0, 1, 1, [0, 200, 0]);
    repo.stage_image(ours).unwrap();
    repo.commit("ours", &CommitOptions::default()).unwrap();

    let mut theirs = base;
    paint(&mut theirs, 0, 0, 1, 1, [0, 0, 200]);
    repo.stage_image(theirs).unwrap();
    repo.commit("theirs", &CommitOptions::on_branch("other")).unwrap();

    let result = repo.merge_branch("other", "").unwrap();
    let head = result.head().unwrap().to_string();
    assert_eq!(repo.version_image(&head).unwrap().pixel(0, 0), &[0, 0, 0]);
}

#[test]
fn test_invalid_repository_config_fails_open() {
    let dir = TempDir::new().unwrap();
    Repository::init(dir.path()).unwrap();
    fs::write(repository_config_path(dir.path()), "[cache]\ncapacity = 0\n").unwrap();

    assert!(matches!(Repository::open(dir.path()), Err(RepoError::Config(_))));
}
