use clap::ValueEnum;
use genui_compiler_html::CompileOptions;
use genui_evaluator::{RenderMode, RenderOptions};
use genui_parser::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "genui.config.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

/// genui configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Render mode (`development` or `production`)
    pub mode: RenderMode,

    /// Platform whose `platform.<name>` overrides apply
    pub platform: Platform,

    /// Type prefix marking native leaf components
    pub native_prefix: String,

    /// Layout animation hints in development mode
    pub animations: bool,

    /// Default output format for `render`
    pub format: OutputFormat,

    /// External data file mounted with every document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// HTML output options
    pub html: HtmlConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HtmlConfig {
    pub full_document: bool,
    pub title: String,
    pub node_ids: bool,
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            mode: render.mode,
            platform: render.platform,
            native_prefix: render.native_prefix,
            animations: render.animations,
            format: OutputFormat::default(),
            data: None,
            html: HtmlConfig::default(),
        }
    }
}

impl Default for HtmlConfig {
    fn default() -> Self {
        let html = CompileOptions::default();
        Self {
            full_document: html.full_document,
            title: html.title,
            node_ids: html.node_ids,
            pretty: html.pretty,
        }
    }
}

impl Config {
    /// Load an explicit config file, else `genui.config.json` in `cwd`, else defaults
    pub fn load(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = cwd.join(DEFAULT_CONFIG_NAME);
                if !path.exists() {
                    return Ok(Config::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .map_err(|err| anyhow::anyhow!("Cannot read {}: {}", config_path.display(), err))?;
        let config: Config = serde_json::from_str(&content)?;
        tracing::debug!(path = %config_path.display(), "Loaded config");
        Ok(config)
    }

    /// Data file path, relative to `cwd`
    pub fn data_path(&self, cwd: &Path) -> Option<PathBuf> {
        self.data.as_ref().map(|data| cwd.join(data))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            mode: self.mode,
            platform: self.platform,
            native_prefix: self.native_prefix.clone(),
            selection: None,
            animations: self.animations,
        }
    }

    pub fn html_options(&self) -> CompileOptions {
        CompileOptions {
            full_document: self.html.full_document,
            title: self.html.title.clone(),
            node_ids: self.html.node_ids,
            pretty: self.html.pretty,
            ..CompileOptions::default()
        }
    }
}
