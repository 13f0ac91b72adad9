//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a commented template if missing (unless FILEDOG_CONFIG is set).
//! - Edits watch-directory entries on behalf of the `watch add/remove/...`
//!   subcommands (the registry itself owns no persistence).
//!
//! Notes:
//! - A malformed document is a hard startup failure; a missing one is not.
//! - Unknown XML fields are rejected (serde deny_unknown_fields) to surface
//!   misconfigurations early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use quick_xml::se::to_string as to_xml_str;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::classify::{Rule, RuleTable};

use super::paths::{config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel, WatchedDir};
use super::{DEFAULT_MAX_PENDING_SECS, DEFAULT_QUIET_PERIOD_MS, DEFAULT_TICK_INTERVAL_MS};

/// Struct mirroring the XML config for (de)serialization.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    default_bucket: Option<String>,
    #[serde(rename = "rule", default, skip_serializing_if = "Vec::is_empty")]
    rules: Vec<XmlRule>,
    #[serde(rename = "watch_dir", default, skip_serializing_if = "Vec::is_empty")]
    watch_dirs: Vec<XmlWatchDir>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quiet_period_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_pending_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct XmlRule {
    #[serde(rename = "match")]
    pattern: String,
    bucket: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct XmlWatchDir {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
}

/// Outcome of resolving configuration at startup.
#[derive(Debug)]
pub enum LoadResult {
    /// An existing file was parsed.
    Loaded(Config, PathBuf),
    /// No file existed; a commented template was written and built-in
    /// defaults are in effect.
    CreatedTemplate(Config, PathBuf),
    /// No file existed and none could be created; built-in defaults.
    Defaults(Config),
}

impl LoadResult {
    pub fn into_config(self) -> Config {
        match self {
            Self::Loaded(cfg, _) | Self::CreatedTemplate(cfg, _) | Self::Defaults(cfg) => cfg,
        }
    }
}

// Map XmlConfig -> Config, validating the classification rules.
fn xml_to_config(parsed: XmlConfig, origin: &Path) -> Result<Config> {
    let mut cfg = Config::default();

    if !parsed.rules.is_empty() || parsed.default_bucket.is_some() {
        let mut rules = Vec::with_capacity(parsed.rules.len());
        for r in &parsed.rules {
            let pattern = r.pattern.trim();
            let bucket = r.bucket.trim();
            if pattern.is_empty() || bucket.is_empty() {
                bail!(
                    "invalid rule in {}: both <match> and <bucket> must be non-empty",
                    origin.display()
                );
            }
            rules.push(Rule::new(pattern, bucket));
        }
        let default_bucket = parsed
            .default_bucket
            .as_deref()
            .map(str::trim)
            .unwrap_or("Others");
        if default_bucket.is_empty() {
            bail!("invalid <default_bucket> in {}: must be non-empty", origin.display());
        }
        cfg.rules = RuleTable::new(rules, default_bucket);
    }

    cfg.watch_dirs = parsed
        .watch_dirs
        .iter()
        .filter(|w| !w.path.trim().is_empty())
        .map(|w| WatchedDir {
            path: PathBuf::from(w.path.trim()),
            enabled: w.enabled.unwrap_or(true),
        })
        .collect();

    if let Some(ms) = parsed.quiet_period_ms {
        cfg.quiet_period = Duration::from_millis(ms.max(1));
    }
    if let Some(secs) = parsed.max_pending_secs {
        cfg.max_pending = Duration::from_secs(secs.max(1));
    }
    if let Some(ms) = parsed.tick_interval_ms {
        cfg.tick_interval = Duration::from_millis(ms.max(1));
    }

    if let Some(s) = parsed.log_level.as_deref() {
        match s.trim().parse::<LogLevel>() {
            Ok(level) => cfg.log_level = level,
            Err(e) => warn!(config = %origin.display(), "{e}; keeping default log level"),
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }

    Ok(cfg)
}

/// Load a Config from a specific XML file path (quick_xml).
/// A document that fails to parse is a hard error, per the startup contract.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed, path)
}

/// Resolve configuration at startup.
///
/// Path precedence: `explicit` (--config) > FILEDOG_CONFIG > platform
/// default. A missing file at the default location gets a template written;
/// a missing file at an explicit location is an error (the user asked for
/// that file specifically).
pub fn load_or_init(explicit: Option<&Path>) -> Result<LoadResult> {
    if let Some(p) = explicit {
        let cfg = load_config_from_path(p)?;
        return Ok(LoadResult::Loaded(cfg, p.to_path_buf()));
    }

    let env_set = env::var_os("FILEDOG_CONFIG").is_some();
    let cfg_path = config_path()?;

    if cfg_path.exists() {
        let cfg = load_config_from_path(&cfg_path)?;
        return Ok(LoadResult::Loaded(cfg, cfg_path));
    }
    if env_set {
        bail!("FILEDOG_CONFIG points at a missing file: {}", cfg_path.display());
    }

    match create_template_config(&cfg_path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(Config::default(), cfg_path)),
        Err(e) => {
            warn!(path = %cfg_path.display(), error = %e, "could not write template config; using defaults");
            Ok(LoadResult::Defaults(Config::default()))
        }
    }
}

/// Create the default template config file and parent directory.
/// Refuses symlinked ancestors; tightens permissions on Unix (best-effort).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/filedog.log".into());

    let defaults = RuleTable::default();
    let mut rules_block = String::new();
    for rule in defaults.rules() {
        rules_block.push_str(&format!(
            "  <rule><match>{}</match><bucket>{}</bucket></rule>\n",
            rule.pattern, rule.bucket
        ));
    }

    let content = format!(
        "<!--\n  filedog configuration (XML)\n\n  Fields:\n    default_bucket        -> folder for files no rule matches\n    rule                  -> repeated; <match> is a full MIME type or a\n                             'major/' prefix, <bucket> the folder name\n    watch_dir             -> repeated; <path> plus optional <enabled>\n    quiet_period_ms       -> a file counts as fully written after this much\n                             quiet time (no events, no size change)\n    max_pending_secs      -> give up on files that never quiesce\n    tick_interval_ms      -> watch loop poll interval\n    log_level             -> quiet | normal | info | debug\n    log_file              -> path to log file (optional; stdout still used)\n\n  Notes:\n    - CLI flags override XML values.\n    - Removing every <rule> falls back to the built-in table shown here.\n-->\n<config>\n  <default_bucket>{}</default_bucket>\n{}  <quiet_period_ms>{}</quiet_period_ms>\n  <max_pending_secs>{}</max_pending_secs>\n  <tick_interval_ms>{}</tick_interval_ms>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        defaults.default_bucket(),
        rules_block,
        DEFAULT_QUIET_PERIOD_MS,
        DEFAULT_MAX_PENDING_SECS,
        DEFAULT_TICK_INTERVAL_MS,
        suggested_log
    );

    fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    info!("Created template config at {}", path.display());
    Ok(())
}

/// Watch-list edits applied by the CLI on behalf of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEdit {
    Add,
    Remove,
    Enable,
    Disable,
}

/// Apply a watch-list edit to the config file and write it back.
/// Returns true when the document changed.
pub fn set_watch_entry(explicit: Option<&Path>, dir: &Path, edit: WatchEdit) -> Result<bool> {
    let cfg_path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    let mut parsed: XmlConfig = if cfg_path.exists() {
        let contents = fs::read_to_string(&cfg_path)
            .with_context(|| format!("read config xml '{}'", cfg_path.display()))?;
        from_xml_str(&contents)
            .with_context(|| format!("parse config xml '{}'", cfg_path.display()))?
    } else {
        XmlConfig::default()
    };

    let dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let dir_str = dir.to_string_lossy().to_string();
    let pos = parsed
        .watch_dirs
        .iter()
        .position(|w| Path::new(w.path.trim()) == dir.as_path());

    let changed = match (edit, pos) {
        (WatchEdit::Add, None) => {
            parsed.watch_dirs.push(XmlWatchDir {
                path: dir_str,
                enabled: Some(true),
            });
            true
        }
        (WatchEdit::Add, Some(_)) => false,
        (WatchEdit::Remove, Some(i)) => {
            parsed.watch_dirs.remove(i);
            true
        }
        (WatchEdit::Remove, None) => false,
        (WatchEdit::Enable, Some(i)) => {
            let was = parsed.watch_dirs[i].enabled.unwrap_or(true);
            parsed.watch_dirs[i].enabled = Some(true);
            !was
        }
        (WatchEdit::Disable, Some(i)) => {
            let was = parsed.watch_dirs[i].enabled.unwrap_or(true);
            parsed.watch_dirs[i].enabled = Some(false);
            was
        }
        (WatchEdit::Enable | WatchEdit::Disable, None) => {
            bail!("directory is not in the watch list: {}", dir.display());
        }
    };

    if changed {
        let body = to_xml_str(&parsed)
            .with_context(|| format!("serialize config xml '{}'", cfg_path.display()))?;
        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cfg_path, format!("{body}\n"))
            .with_context(|| format!("write config xml '{}'", cfg_path.display()))?;
        info!(config = %cfg_path.display(), dir = %dir.display(), ?edit, "updated watch list");
    }

    Ok(changed)
}
