//! Merge rules: built-in defaults and environment overrides.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Environment variables look like `TESSERA__REGION__MAX_DEPTH`.
const ENV_PREFIX: &str = "TESSERA";
const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("region.max_depth", 8)?
        .set_default("region.min_size", 8)?
        .set_default("region.threshold", 10.0)?
        .set_default("region.parallel_depth", 2)?
        .set_default("commitment.odd_node", "promote")?
        .set_default("merge.change_threshold", 10)?
        .set_default("cache.capacity", 100)?
        .set_default("security.enabled", true)
}

/// Highest-precedence layer: process environment.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}
