use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use genui_common::{load_json, RealFileSystem};
use genui_evaluator::{
    compile_function, CompileError, DocumentValidator, ObjectMap, Runtime, ValidationLevel,
    ValidationWarning,
};
use genui_parser::{format_error, UIComponent};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Component documents to check
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Also list documents without problems
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
struct Diagnostic {
    level: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl From<&ValidationWarning> for Diagnostic {
    fn from(warning: &ValidationWarning) -> Self {
        Self {
            level: match warning.level {
                ValidationLevel::Warning => "warning",
                ValidationLevel::Error => "error",
            },
            message: warning.message.clone(),
            path: warning.path.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    diagnostics: Vec<Diagnostic>,
    /// Annotated source of scripts that failed to parse (text output only)
    #[serde(skip)]
    excerpts: Vec<String>,
}

impl FileReport {
    fn errors(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.level == "error").count()
    }

    fn warnings(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.level == "warning").count()
    }
}

pub fn check(args: CheckArgs, config: &Config, cwd: &Path) -> Result<()> {
    let reports: Vec<FileReport> = args
        .documents
        .iter()
        .map(|document| report_file(document, &cwd.join(document), config))
        .collect();

    let total_errors: usize = reports.iter().map(FileReport::errors).sum();
    let total_warnings: usize = reports.iter().map(FileReport::warnings).sum();

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        ReportFormat::Text => {
            for report in &reports {
                print_report(report, args.verbose);
            }
            println!("   Files checked: {}", reports.len());
            if total_errors > 0 {
                println!("   {} {}", "Errors:".red(), total_errors);
            }
            if total_warnings > 0 {
                println!("   {} {}", "Warnings:".yellow(), total_warnings);
            }
            if total_errors == 0 && total_warnings == 0 {
                println!("   {} No issues found!", "✓".green());
            }
        }
    }

    // Exit with error code if there are errors
    if total_errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &FileReport, verbose: bool) {
    if report.diagnostics.is_empty() {
        if verbose {
            println!("{} {}", "✓".green(), report.file);
        }
        return;
    }

    println!("{}", report.file);
    for diagnostic in &report.diagnostics {
        let level = match diagnostic.level {
            "error" => "error".red().bold(),
            _ => "warning".yellow().bold(),
        };
        match &diagnostic.path {
            Some(path) if !path.is_empty() => {
                println!("  {} [{}] {}", level, path, diagnostic.message)
            }
            _ => println!("  {} {}", level, diagnostic.message),
        }
    }
    for excerpt in &report.excerpts {
        println!("{}", excerpt);
    }
    println!();
}

fn report_file(document: &Path, path: &Path, config: &Config) -> FileReport {
    let (warnings, excerpts) = match load_json(&RealFileSystem, path) {
        Ok(raw) => (check_document(&raw, config), script_excerpts(&raw)),
        Err(err) => (vec![ValidationWarning::error(err.to_string())], Vec::new()),
    };
    FileReport {
        file: document.display().to_string(),
        diagnostics: warnings.iter().map(Diagnostic::from).collect(),
        excerpts,
    }
}

/// Source excerpts for the root component's methods and effects that fail to parse
fn script_excerpts(raw: &JsonValue) -> Vec<String> {
    let mut scripts: Vec<(String, &str)> = Vec::new();
    if let Some(JsonValue::Object(methods)) = raw.get("methods") {
        for (name, def) in methods {
            if let Some(source) = def.get("fn").and_then(JsonValue::as_str) {
                scripts.push((name.clone(), source));
            }
        }
    }
    if let Some(JsonValue::Array(effects)) = raw.get("effects") {
        for (index, effect) in effects.iter().enumerate() {
            if let Some(source) = effect.get("fn").and_then(JsonValue::as_str) {
                scripts.push((format!("effect[{}]", index), source));
            }
        }
    }

    scripts
        .into_iter()
        .filter_map(|(name, source)| match compile_function(&name, source) {
            Ok(_) => None,
            Err(CompileError::Parse { name, code, source }) => {
                Some(format_error(&code, &name, &source))
            }
        })
        .collect()
}

/// Every problem found in one document: validation, method compilation,
/// effects and a trial render
pub fn check_document(raw: &JsonValue, config: &Config) -> Vec<ValidationWarning> {
    let mut validator = DocumentValidator::new();
    let mut warnings = validator.validate(raw);
    if warnings.iter().any(ValidationWarning::is_error) || !UIComponent::is_component(raw) {
        return warnings;
    }

    let component = match UIComponent::from_json(raw) {
        Ok(component) => component,
        Err(err) => {
            warnings.push(ValidationWarning::error(err.to_string()));
            return warnings;
        }
    };

    let mounted = Runtime::new(config.render_options()).mount(component, ObjectMap::new());
    for failure in &mounted.effects().failed {
        warnings.push(ValidationWarning::error(format!(
            "Effect {} failed: {}",
            failure.index, failure.message
        )));
    }

    let doc = mounted.render();
    let failed_nodes = doc.find_all(&|node| node.is_error());
    debug!(failed = failed_nodes.len(), "Trial render finished");
    for node in failed_nodes {
        if let genui_evaluator::VNode::Error { message, node_id } = node {
            warnings.push(ValidationWarning::error(match node_id {
                Some(id) => format!("Element `{}` failed to render: {}", id, message),
                None => format!("Render failed: {}", message),
            }));
        }
    }
    warnings.extend(validator.check_rendered_keys(&doc.nodes));
    warnings
}
