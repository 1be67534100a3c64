pub mod check;
pub mod init;
pub mod render;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};

use anyhow::{anyhow, Result};
use genui_common::{load_json, RealFileSystem};
use genui_evaluator::{ObjectMap, Value};
use std::path::Path;

/// External data for `mount`: a JSON object whose entries become data keys
pub fn load_external_data(path: &Path) -> Result<ObjectMap> {
    let json = load_json(&RealFileSystem, path)?;
    let serde_json::Value::Object(entries) = json else {
        return Err(anyhow!("Data file {} must contain a JSON object", path.display()));
    };
    Ok(entries
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_json(value)))
        .collect())
}
