//! Repository config file source: <repo>/.tessera/config.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::{Path, PathBuf};

pub fn repository_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(crate::repository::METADATA_DIR).join("config.toml")
}

/// Add the repository config file to the builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>, repo_root: &Path) -> ConfigBuilder<DefaultState> {
    let path = repository_config_path(repo_root);
    if path.exists() {
        builder.add_source(File::from(path).required(false))
    } else {
        builder
    }
}
