use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{AppContext, InitArgs},
    embedding::{DEFAULT_BASE_URL, DEFAULT_MODEL, DIMENSIONS},
    scope::CaptureFlavor,
};

/// Config file names checked in priority order; the first one found wins.
pub const CONFIG_FILES: [&str; 4] = [
    "scopegraph.toml",
    "scopegraph.yaml",
    "scopegraph.json",
    ".scopegraph.toml",
];

/// Environment prefix; `SCOPEGRAPH__BUILD__LOOKBACK_LIMIT=200` sets
/// `build.lookback_limit`.
pub const ENV_PREFIX: &str = "SCOPEGRAPH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Extra ignore globs (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Graph building settings
    pub build: BuildConfig,

    /// Embedding provider and annotation pass
    pub embed: EmbedConfig,

    /// Similarity query settings
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig
{
    /// Grammars to extract; empty means all supported
    pub languages: Vec<String>,

    /// Snapshot path, relative to the analysed root
    pub snapshot_file: String,

    /// Backward signature search bound; unset uses each grammar's default
    pub lookback_limit: Option<usize>,
    /// Backing for balanced sub-scans (C and Java only)
    /// Backing for balanced sub-scans
    pub capture: CaptureFlavor,

    /// Files larger than this are skipped
    pub max_file_bytes: u64,

    /// Skip `*.test.*` and `*.spec.*` files
    pub skip_test_files: bool,

    /// Vectors per batch file in sharded snapshots
    pub shard_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig
{
    pub model: String,
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub dimensions: usize,
    pub batch_size: usize,
    pub retries: u32,

    /// Initial retry wait, doubled per attempt
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig
{
    pub top_k: usize,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                ".git/**".to_string(),
                "__pycache__/**".to_string(),
                "*.min.js".to_string(),
            ],
            build: BuildConfig::default(),
            embed: EmbedConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Default for BuildConfig
{
    fn default() -> Self
    {
        Self {
            languages: Vec::new(),
            snapshot_file: "scopegraph.json".to_string(),
            lookback_limit: None,
            capture: CaptureFlavor::default(),
            max_file_bytes: 2 * 1024 * 1024,
            skip_test_files: false,
            shard_batch_size: 256,
        }
    }
}

impl Default for EmbedConfig
{
    fn default() -> Self
    {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimensions: DIMENSIONS,
            batch_size: 32,
            retries: 3,
            backoff_ms: 500,
        }
    }
}

impl Default for QueryConfig
{
    fn default() -> Self
    {
        Self { top_k: 10 }
    }
}

/// Load configuration from the current directory and the environment.
pub fn load_config() -> Result<Config>
{
    load_config_in(Path::new("."))
}

/// Load configuration from `dir` and the environment. Missing keys fall
/// back to their defaults.
pub fn load_config_in(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("Would write {}:\n{toml_string}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_round_trip_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();

        assert_eq!(back.build.snapshot_file, "scopegraph.json");
        assert_eq!(back.build.lookback_limit, None);
        assert_eq!(back.embed.api_key_env, "OPENAI_API_KEY");
        assert_eq!(back.embed.dimensions, DIMENSIONS);
        assert_eq!(back.query.top_k, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults()
    {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path()
                .join("scopegraph.toml"),
            "[build]\nlookback_limit = 200\ncapture = \"counting\"\nlanguages = [\"c\"]\n",
        )
        .unwrap();

        let cfg = load_config_in(tmp.path()).unwrap();
        assert_eq!(cfg.build.lookback_limit, Some(200));
        assert_eq!(cfg.build.capture, CaptureFlavor::Counting);
        assert_eq!(cfg.build.languages, vec!["c".to_string()]);
        assert_eq!(cfg.build.shard_batch_size, 256);
        assert_eq!(cfg.embed.batch_size, 32);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force()
    {
        let tmp = TempDir::new().unwrap();
        let ctx = AppContext {
            quiet: true,
            no_color: true,
            dry_run: false,
        };
        let args = || InitArgs {
            path: tmp
                .path()
                .to_path_buf(),
            force: false,
        };

        init(args(), &ctx).unwrap();
        assert!(
            tmp.path()
                .join("scopegraph.toml")
                .exists()
        );
        assert!(init(args(), &ctx).is_err());
    }
}
