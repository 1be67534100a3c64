use crate::config::{Config, OutputFormat, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

const EXAMPLE_DOCUMENT: &str = r##"{
  "id": "counter",
  "name": "Counter",
  "props": { "label": "Clicks" },
  "states": { "count": 0 },
  "methods": {
    "increment": { "fn": "() => setState('count', count + 1)" }
  },
  "render": {
    "id": "root",
    "type": "view",
    "props": { "style": { "display": "flex", "gap": 8 } },
    "children": [
      { "id": "label", "type": "text", "children": "${props.label}: {{ count }}" },
      {
        "id": "increment",
        "type": "button",
        "props": { "onClick": "increment", "style": { "padding": "4px 12px", "background": "#3366FF", "color": "white" } },
        "children": "+1"
      }
    ]
  }
}
"##;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for example documents
    #[arg(short, long, default_value = "ui")]
    pub dir: String,

    /// Default output format written to the config
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,

    /// Force overwrite existing config
    #[arg(long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing genui project...".bright_blue().bold());

    let doc_dir = cwd.join(&args.dir);
    if !doc_dir.exists() {
        fs::create_dir_all(&doc_dir)?;
        println!("  {} Created {}/", "✓".green(), args.dir);
    }

    let example_file = doc_dir.join("counter.json");
    if !example_file.exists() {
        fs::write(&example_file, EXAMPLE_DOCUMENT)?;
        println!("  {} Created {}/counter.json", "✓".green(), args.dir);
    }

    let config = Config {
        format: args.format,
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/counter.json", args.dir);
    println!("  2. Run: genui check {}/counter.json", args.dir);
    println!("  3. Run: genui render {}/counter.json --trigger increment", args.dir);

    Ok(())
}
