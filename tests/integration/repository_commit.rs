//! Staging, committing, history and rollback through the repository facade

use super::test_utils::{flat, noise, paint, small_config, temp_repo};
use tempfile::TempDir;
use tessera::{CommitOptions, Repository, RepoError};

#[test]
fn test_commit_requires_staged_image() {
    let (_dir, mut repo) = temp_repo();
    let result = repo.commit("nothing", &CommitOptions::default());
    assert!(matches!(result, Err(RepoError::NothingStaged)));
    assert!(repo.list_versions().is_empty());
}

#[test]
fn test_commit_chain_and_history() {
    let (_dir, mut repo) = temp_repo();

    repo.stage_image(flat(32, 32, 10)).unwrap();
    let first = repo.commit("first", &CommitOptions::default()).unwrap();
    assert!(repo.staged().is_none());

    repo.stage_image(flat(32, 32, 20)).unwrap();
    let second = repo.commit("second", &CommitOptions::default()).unwrap();

    repo.stage_image(noise(32, 32, 3)).unwrap();
    let third = repo.commit("third", &CommitOptions::default()).unwrap();

    let current = repo.current_version().unwrap();
    assert_eq!(current.id, third);
    assert_eq!(current.parent_id.as_deref(), Some(second.as_str()));
    assert_eq!(current.branch, "main");
    assert!(!current.is_merge_commit());

    let history: Vec<&str> = repo.history(None).unwrap().iter().map(|v| v.id.as_str()).collect();
    assert_eq!(history, vec![third.as_str(), second.as_str(), first.as_str()]);

    let listed: Vec<&str> = repo.list_versions().iter().map(|v| v.message.as_str()).collect();
    assert_eq!(listed, vec!["first", "second", "third"]);
    assert!(repo.history(Some("missing")).is_err());
}

#[test]
fn test_committed_image_round_trips() {
    let (_dir, mut repo) = temp_repo();
    let image = noise(24, 16, 9);
    repo.stage_image(image.clone()).unwrap();
    let id = repo.commit("noise", &CommitOptions::default()).unwrap();

    assert_eq!(repo.version_image(&id).unwrap(), image);
    let version = repo.version(&id).unwrap();
    assert_eq!((version.width, version.height), (24, 16));
    assert!(version.leaf_count > 1);
}

#[test]
fn test_has_changes_against_current_version() {
    let (_dir, mut repo) = temp_repo();
    let image = flat(16, 16, 90);
    assert!(repo.has_changes(&image).unwrap());

    repo.stage_image(image.clone()).unwrap();
    repo.commit("base", &CommitOptions::default()).unwrap();
    assert!(!repo.has_changes(&image).unwrap());

    let mut edited = image;
    paint(&mut edited, 0, 0, 4, 4, [200, 0, 0]);
    assert!(repo.has_changes(&edited).unwrap());
}

#[test]
fn test_rollback_moves_head_without_new_version() {
    let (_dir, mut repo) = temp_repo();
    repo.stage_image(flat(16, 16, 1)).unwrap();
    let first = repo.commit("first", &CommitOptions::default()).unwrap();
    repo.stage_image(flat(16, 16, 2)).unwrap();
    repo.commit("second", &CommitOptions::default()).unwrap();

    repo.rollback(&first, None).unwrap();
    assert_eq!(repo.current_version().unwrap().id, first);
    assert_eq!(repo.branch("main").unwrap().head.as_deref(), Some(first.as_str()));
    assert_eq!(repo.list_versions().len(), 2);

    repo.stage_image(flat(16, 16, 3)).unwrap();
    let third = repo.commit("third", &CommitOptions::default()).unwrap();
    assert_eq!(repo.version(&third).unwrap().parent_id.as_deref(), Some(first.as_str()));

    assert!(matches!(repo.rollback("missing", None), Err(RepoError::UnknownVersion(_))));
    assert!(matches!(
        repo.rollback(&first, Some("nope")),
        Err(RepoError::UnknownBranch(_))
    ));
}

#[test]
fn test_compare_versions_localizes_edit() {
    let (_dir, mut repo) = temp_repo();
    let base = noise(32, 32, 5);
    repo.stage_image(base.clone()).unwrap();
    let a = repo.commit("a", &CommitOptions::default()).unwrap();

    let mut edited = base;
    paint(&mut edited, 20, 20, 2, 2, [0, 255, 0]);
    repo.stage_image(edited).unwrap();
    let b = repo.commit("b", &CommitOptions::default()).unwrap();

    let comparison = repo.compare_versions(&a, &b).unwrap();
    assert!(!comparison.identical);
    assert!(!comparison.regions.is_empty());
    assert!(comparison.regions.iter().all(|r| r.contains(20, 20) || r.contains(21, 21)));
    assert_eq!(comparison.changed_leaves.as_ref().map(Vec::len), Some(comparison.regions.len()));
    assert_eq!(comparison.visualization.pixel(0, 0).len(), 3);

    let same = repo.compare_versions(&a, &a).unwrap();
    assert!(same.identical);
    assert!(same.regions.is_empty());
}

#[test]
fn test_leaf_proofs_verify_against_version_root() {
    let (_dir, mut repo) = temp_repo();
    repo.stage_image(noise(20, 20, 17)).unwrap();
    let id = repo.commit("proof", &CommitOptions::default()).unwrap();
    let leaves = repo.version(&id).unwrap().leaf_count;

    for index in 0..leaves {
        let proof = repo.leaf_proof(&id, index).unwrap();
        assert!(proof.verify());
        assert_eq!(proof.root_hash, repo.version(&id).unwrap().root_hash);
    }
    assert!(repo.leaf_proof(&id, leaves).is_err());
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (first, staged) = {
        let mut repo = Repository::init(dir.path()).unwrap();
        repo.stage_image(flat(16, 16, 40)).unwrap();
        let first = repo.commit("persisted", &CommitOptions::default()).unwrap();
        repo.create_branch("feature", None, "work in progress").unwrap();
        repo.switch_branch("feature").unwrap();
        let staged = noise(16, 16, 2);
        repo.stage_image(staged.clone()).unwrap();
        (first, staged)
    };

    let repo = Repository::open_with_config(dir.path(), small_config()).unwrap();
    assert_eq!(repo.current_branch(), "feature");
    assert_eq!(repo.current_version().unwrap().id, first);
    assert_eq!(repo.version(&first).unwrap().message, "persisted");
    assert_eq!(repo.branch("feature").unwrap().description, "work in progress");
    assert_eq!(repo.staged(), Some(&staged));
    assert_eq!(repo.version_image(&first).unwrap(), flat(16, 16, 40));
}

#[test]
fn test_stage_file_and_open_errors() {
    let (dir, mut repo) = temp_repo();
    let path = dir.path().join("input.png");
    noise(12, 12, 4).save(&path).unwrap();

    repo.stage_file(&path).unwrap();
    assert_eq!(repo.staged(), Some(&noise(12, 12, 4)));
    assert!(repo.stage_file(dir.path().join("missing.png")).is_err());

    let empty = TempDir::new().unwrap();
    assert!(matches!(
        Repository::open(empty.path()),
        Err(RepoError::NotARepository(_))
    ));
}

#[test]
fn test_rollback_of_other_branch_leaves_checkout_alone() {
    let (_dir, mut repo) = temp_repo();
    repo.stage_image(flat(16, 16, 1)).unwrap();
    let base = repo.commit("base", &CommitOptions::default()).unwrap();
    repo.create_branch("side", None, "").unwrap();
    repo.stage_image(flat(16, 16, 2)).unwrap();
    repo.commit("side work", &CommitOptions::on_branch("side")).unwrap();
    repo.stage_image(flat(16, 16, 3)).unwrap();
    let main_tip = repo.commit("main work", &CommitOptions::default()).unwrap();

    repo.rollback(&base, Some("side")).unwrap();

    assert_eq!(repo.branch("side").unwrap().head.as_deref(), Some(base.as_str()));
    assert_eq!(repo.branch("main").unwrap().head.as_deref(), Some(main_tip.as_str()));
    assert_eq!(repo.current_branch(), "main");
    assert_eq!(repo.current_version().unwrap().id, main_tip);
    assert_eq!(repo.list_versions().len(), 3);
}

#[test]
fn test_compare_staged_against_current_version() {
    let (_dir, mut repo) = temp_repo();
    let base = noise(32, 32, 12);
    repo.stage_image(base.clone()).unwrap();
    repo.commit("base", &CommitOptions::default()).unwrap();

    repo.stage_image(base.clone()).unwrap();
    let unchanged = repo.compare_staged().unwrap();
    assert!(unchanged.identical);
    assert!(unchanged.regions.is_empty());

    let mut edited = base;
    paint(&mut edited, 9, 9, 2, 2, [255, 255, 0]);
    repo.stage_image(edited.clone()).unwrap();
    let changed = repo.compare_staged().unwrap();
    assert!(!changed.identical);
    assert_eq!(changed.regions.len(), 1);
    assert!(changed.regions[0].contains(9, 9));
    assert_eq!(changed.changed_leaves.as_ref().map(Vec::len), Some(1));
    assert_eq!(changed.visualization.width(), 32);

    let direct = repo.compare_with_current(&edited).unwrap();
    assert_eq!(direct.regions, changed.regions);
    assert!(repo.staged().is_some());
}
