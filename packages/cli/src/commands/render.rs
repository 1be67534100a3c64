use super::load_external_data;
use crate::config::{Config, OutputFormat};
use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use colored::Colorize;
use genui_common::{load_document, RealFileSystem};
use genui_compiler_html::{compile_to_html, CompileOptions};
use genui_evaluator::{DocumentValidator, ObjectMap, RenderMode, RenderOptions, Runtime};
use genui_parser::{Platform, UIComponent};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Component document (JSON)
    pub document: PathBuf,

    /// External data file (JSON object), overrides config
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Render in production mode (no error nodes, no animation hints)
    #[arg(long)]
    pub production: bool,

    /// Platform overrides to apply (web, ios, android)
    #[arg(long, value_parser = parse_platform)]
    pub platform: Option<Platform>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Wrap HTML output in a full page
    #[arg(long)]
    pub full_document: bool,

    /// Methods to trigger, in order, before rendering
    #[arg(long = "trigger", value_name = "METHOD")]
    pub triggers: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_platform(name: &str) -> Result<Platform, String> {
    serde_json::from_value(JsonValue::String(name.to_lowercase()))
        .map_err(|_| format!("Unknown platform `{}` (expected web, ios or android)", name))
}

/// Resolved settings for one render: config with command-line flags applied
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub render: RenderOptions,
    pub html: CompileOptions,
    pub format: OutputFormat,
    pub triggers: Vec<String>,
}

impl RenderSettings {
    pub fn from_config(config: &Config, args: &RenderArgs) -> Self {
        let mut render = config.render_options();
        if args.production {
            render.mode = RenderMode::Production;
        }
        if let Some(platform) = args.platform {
            render.platform = platform;
        }

        let mut html = config.html_options();
        if args.full_document {
            html.full_document = true;
        }

        Self {
            render,
            html,
            format: args.format.unwrap_or(config.format),
            triggers: args.triggers.clone(),
        }
    }
}

pub fn render(args: RenderArgs, config: &Config, cwd: &Path) -> Result<()> {
    let settings = RenderSettings::from_config(config, &args);
    let document_path = cwd.join(&args.document);

    let (raw, component) = load_document(&RealFileSystem, &document_path)
        .with_context(|| format!("Failed to load {}", document_path.display()))?;

    for warning in DocumentValidator::new().validate(&raw) {
        if warning.is_error() {
            warn!(document = %document_path.display(), "{}", warning);
        } else {
            info!(document = %document_path.display(), "{}", warning);
        }
    }

    let data_path = args
        .data
        .map(|data| cwd.join(data))
        .or_else(|| config.data_path(cwd));
    let external = match data_path {
        Some(path) => load_external_data(&path)
            .with_context(|| format!("Failed to load data {}", path.display()))?,
        None => ObjectMap::new(),
    };

    let output = render_component(component, external, &settings)?;

    match &args.output {
        Some(path) => {
            let path = cwd.join(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &output)?;
            eprintln!(
                "{} {} → {}",
                "✓".green(),
                args.document.display(),
                path.display()
            );
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Mount, run the requested triggers, render and serialize
pub fn render_component(
    component: UIComponent,
    external: ObjectMap,
    settings: &RenderSettings,
) -> Result<String> {
    let runtime = Runtime::new(settings.render.clone());
    let mounted = runtime.mount(component, external);

    for failure in &mounted.effects().failed {
        warn!(effect = failure.index, "Effect failed: {}", failure.message);
    }

    mounted.render();
    for method in &settings.triggers {
        if !mounted.methods().contains(method) {
            return Err(anyhow!("Unknown method `{}` on component `{}`", method, mounted.id()));
        }
        mounted
            .trigger(method, &[])
            .map_err(|err| anyhow!("Method `{}` failed: {}", method, err))?;
    }
    let doc = mounted.render();

    match settings.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&doc)?),
        OutputFormat::Html => compile_to_html(&doc, &settings.html).map_err(|err| anyhow!(err)),
    }
}
