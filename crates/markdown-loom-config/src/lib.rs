use log::warn;
use markdown_loom_engine::options::{FormatOptions, HtmlOptions, LoomOptions, ParseOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every table is optional.
///
/// ```toml
/// output_dir = "~/site"
///
/// [html]
/// escape_html = true
///
/// [format]
/// bullet_marker = "-"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where `html` writes `<name>.html` when no output is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub parse: ParseOptions,
    pub html: HtmlOptions,
    pub format: FormatOptions,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.output_dir = config.output_dir.map(|dir| match Self::expand_path(&dir) {
            Some(expanded) => expanded,
            None => {
                warn!("could not expand output_dir {}; using it as written", dir.display());
                dir
            }
        });
        config.check_markers();

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-loom");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// The engine options this file describes.
    pub fn options(&self) -> LoomOptions {
        LoomOptions {
            parse: self.parse.clone(),
            html: self.html.clone(),
            format: self.format.clone(),
        }
    }

    /// Drops forced markers the formatter cannot write.
    fn check_markers(&mut self) {
        let format = &mut self.format;
        for (name, marker, allowed) in [
            ("emphasis_marker", &mut format.emphasis_marker, &['*', '_'][..]),
            ("strong_marker", &mut format.strong_marker, &['*', '_'][..]),
            ("bullet_marker", &mut format.bullet_marker, &['-', '*', '+'][..]),
        ] {
            if let Some(c) = *marker
                && !allowed.contains(&c)
            {
                warn!("ignoring {name} {c:?}; expected one of {allowed:?}");
                *marker = None;
            }
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
