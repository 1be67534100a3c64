use crate::error::CommonError;
use crate::result::CommonResult;
use genui_parser::UIComponent;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File system abstraction for document loading and testing
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// In-memory file system for testing
#[derive(Default)]
pub struct MockFileSystem {
    pub files: HashMap<PathBuf, String>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

/// Read a JSON file
pub fn load_json(fs: &dyn FileSystem, path: &Path) -> CommonResult<JsonValue> {
    let contents = fs.read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Read a component document. The root must be a component (an object with
/// a `render` tree).
pub fn load_document(fs: &dyn FileSystem, path: &Path) -> CommonResult<(JsonValue, UIComponent)> {
    let raw = load_json(fs, path)?;
    if !UIComponent::is_component(&raw) {
        return Err(CommonError::InvalidDocument {
            path: path.display().to_string(),
            message: "root must be a component with a 'render' tree".to_string(),
        });
    }
    let component = UIComponent::from_json(&raw).map_err(|err| CommonError::InvalidDocument {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    Ok((raw, component))
}
