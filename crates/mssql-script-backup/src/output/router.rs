//! Append script output to templated file paths.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::Result;
use crate::pipeline::{PipelineKind, ScriptOutput};

use super::template::{OutputTemplate, TemplateTokens};

/// Routes [`ScriptOutput`] events to files named by an [`OutputTemplate`].
///
/// Writes always append; routing the same event twice grows the file twice.
#[derive(Debug, Clone)]
pub struct OutputRouter {
    template: OutputTemplate,
    started: DateTime<Local>,
    written: BTreeSet<PathBuf>,
}

impl OutputRouter {
    /// Router stamping every path with `started` for `{4}`.
    pub fn new(template: OutputTemplate, started: DateTime<Local>) -> Self {
        Self {
            template,
            started,
            written: BTreeSet::new(),
        }
    }

    pub fn template(&self) -> &OutputTemplate {
        &self.template
    }

    /// Path an event would be written to.
    pub fn path_for(&self, output: &ScriptOutput, kind: PipelineKind) -> PathBuf {
        PathBuf::from(self.template.expand(&TemplateTokens {
            server: &output.server,
            database: &output.database,
            object: &output.name,
            type_name: &output.type_name,
            timestamp: self.started,
            kind,
        }))
    }

    /// Append an event's text to its file, creating directories as needed.
    pub fn route(&mut self, output: &ScriptOutput, kind: PipelineKind) -> Result<PathBuf> {
        let path = self.path_for(output, kind);
        append(&path, &output.text)?;
        debug!("{} {}: {} -> {}", kind, output.type_name, output.name, path.display());
        self.written.insert(path.clone());
        Ok(path)
    }

    /// Distinct files written so far, sorted.
    pub fn written(&self) -> &BTreeSet<PathBuf> {
        &self.written
    }
}

fn append(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
