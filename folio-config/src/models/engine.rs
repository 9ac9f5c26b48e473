use anyhow::{Context, anyhow};
use folio_core::query::{PaginationSettings, SortSettings};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::util::parse_bool;
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

pub const CONFIG_PATH_VAR: &str = "FOLIO_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "FOLIO_CONFIG_JSON";
pub const DEFAULT_PAGE_SIZE_VAR: &str = "FOLIO_DEFAULT_PAGE_SIZE";
pub const ENABLE_MULTI_SORT_VAR: &str = "FOLIO_ENABLE_MULTI_SORT";

/// Source that produced the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Defaults handed to every provider's sort and pagination models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page parameter names, default page size, and page size limits.
    /// Setting `page_size_limit` to null makes the page size parameter
    /// ignored.
    pub pagination: PaginationSettings,
    /// Sort parameter name, token separator, and whether more than one
    /// attribute may be sorted at once.
    pub sort: SortSettings,
}

impl EngineConfig {
    /// Load engine configuration using environment variables.
    /// Evaluation order:
    /// 1) `$FOLIO_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$FOLIO_CONFIG_JSON` (inline JSON),
    /// 3) the first of `folio.toml`, `folio.json`, `config/folio.toml`,
    ///    `config/folio.json` found in the working directory,
    /// 4) defaults if none of the above is present.
    ///
    /// `$FOLIO_DEFAULT_PAGE_SIZE` and `$FOLIO_ENABLE_MULTI_SORT` override the
    /// loaded values.
    pub fn load_from_env() -> anyhow::Result<(Self, EngineConfigSource)> {
        Self::load_with(|name| env::var(name).ok(), Path::new("."))
    }

    /// [`load_from_env`](Self::load_from_env) with an explicit variable
    /// lookup and a root directory for the default files.
    pub fn load_with<F>(
        lookup: F,
        root: &Path,
    ) -> anyhow::Result<(Self, EngineConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = Self::load_base(&lookup, root)?;
        config.apply_overrides(&lookup)?;
        debug!(source = ?source, "loaded engine config");
        Ok((config, source))
    }

    fn load_base<F>(
        lookup: &F,
        root: &Path,
    ) -> anyhow::Result<(Self, EngineConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, EngineConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, EngineConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(root) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, EngineConfigSource::File(path)));
        }

        Ok((Self::default(), EngineConfigSource::Default))
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(DEFAULT_PAGE_SIZE_VAR)
            && !raw.trim().is_empty()
        {
            self.pagination.default_page_size =
                raw.trim().parse().with_context(|| {
                    format!("{DEFAULT_PAGE_SIZE_VAR} must be a non-negative integer")
                })?;
        }

        if let Some(raw) = lookup(ENABLE_MULTI_SORT_VAR) {
            match parse_bool(&raw) {
                Some(enabled) => self.sort.enable_multi_sort = enabled,
                None => warn!(
                    value = %raw,
                    "ignoring unrecognised {ENABLE_MULTI_SORT_VAR}"
                ),
            }
        }
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read engine config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid engine config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!("invalid engine config {}: {}", path.display(), err)
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // Try TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse engine config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid engine config json: {err}"))
    }

    /// Reject settings the engine cannot work with; return warnings for
    /// settings that work but are probably unintended.
    pub fn validate(&self) -> Result<ConfigWarnings, ConfigGuardRailError> {
        validation::apply_guard_rails(self)
    }

    fn find_default_file(root: &Path) -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "folio.toml",
            "folio.json",
            "config/folio.toml",
            "config/folio.json",
        ];

        CANDIDATES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists())
    }
}
