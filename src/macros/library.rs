//! Saved macros (`macros.json`).
//!
//! Only the macro text is persisted; steps are parsed on demand.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{parse_macro, MacroStep};
use crate::errors::{OpenTermError, Result};
use crate::vault::file_store::write_atomic;

/// File name of the macro library inside the data directory.
pub const MACROS_FILE_NAME: &str = "macros.json";

/// A named, saved macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Macro {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Macro {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Parse the content into playable steps.
    pub fn steps(&self) -> Vec<MacroStep> {
        parse_macro(&self.content)
    }
}

/// In-memory view of `macros.json`.
#[derive(Debug)]
pub struct MacroLibrary {
    path: PathBuf,
    macros: Vec<Macro>,
}

impl MacroLibrary {
    /// Load the library; a missing file is an empty library.
    pub fn load(path: &Path) -> Result<Self> {
        let macros = match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                OpenTermError::DecodeFailure(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            macros,
        })
    }

    /// Write the library back atomically.
    pub fn save(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.macros)
            .map_err(|e| OpenTermError::SerializationError(format!("macros: {e}")))?;
        write_atomic(&self.path, &bytes)
    }

    /// Add a macro.  Names are unique, compared case-insensitively.
    pub fn add(&mut self, name: &str, content: &str) -> Result<&Macro> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OpenTermError::CommandFailed(
                "macro name cannot be empty".into(),
            ));
        }
        if self.find(name).is_some() {
            return Err(OpenTermError::MacroAlreadyExists(name.to_string()));
        }
        self.macros.push(Macro::new(name, content));
        Ok(&self.macros[self.macros.len() - 1])
    }

    /// Replace the content of an existing macro.
    pub fn update_content(&mut self, name_or_id: &str, content: &str) -> Result<&Macro> {
        let index = self
            .position(name_or_id)
            .ok_or_else(|| OpenTermError::MacroNotFound(name_or_id.to_string()))?;
        let entry = &mut self.macros[index];
        entry.content = content.to_string();
        entry.updated_at = Utc::now();
        Ok(entry)
    }

    /// Remove a macro by name or id.
    pub fn remove(&mut self, name_or_id: &str) -> Result<Macro> {
        let index = self
            .position(name_or_id)
            .ok_or_else(|| OpenTermError::MacroNotFound(name_or_id.to_string()))?;
        Ok(self.macros.remove(index))
    }

    /// Find a macro by id or case-insensitive name.
    pub fn find(&self, name_or_id: &str) -> Option<&Macro> {
        self.position(name_or_id).map(|i| &self.macros[i])
    }

    /// All macros, sorted by name.
    pub fn list(&self) -> Vec<&Macro> {
        let mut list: Vec<&Macro> = self.macros.iter().collect();
        list.sort_by_key(|m| m.name.to_lowercase());
        list
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    fn position(&self, name_or_id: &str) -> Option<usize> {
        let key = name_or_id.trim();
        let id = Uuid::parse_str(key).ok();
        self.macros
            .iter()
            .position(|m| Some(m.id) == id || m.name.eq_ignore_ascii_case(key))
    }
}
