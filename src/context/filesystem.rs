//! Filesystem context: one folder of JSON documents per stage boundary.
//!
//! With the default [`LayoutConfig`], stage `k` reads every `*.json` file in
//! `<root>/stage_k` and writes its results to `<root>/stage_{k+1}`:
//!
//! ```text
//! <document_root>/
//! ├── stage_0/   inputs of the first stage (unused when it produces its own)
//! ├── stage_1/   results of stage 0, inputs of stage 1
//! └── stage_2/   results of stage 1
//! ```
//!
//! A result is stored as `{id}.json`, or `{id}_{n}.json` when it is the
//! `n`th of a batch of several (the results of one input, or everything a
//! stage produced on its own). Results without an id field share one
//! sequence number per batch. An id that is not a plain file name (a path
//! separator, `.` or `..`) fails the run instead of escaping the folder.

use super::adapter::{ContextAdapter, Inputs, StageBinding};
use super::contextual::{ContextualPipeline, Lift};
use crate::codec::{JsonCodec, require_codec};
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::pipeline::{DynStage, Pipeline, Value};
use anyhow::{Context as _, bail};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Root folder every stage folder lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemContext {
    document_root: PathBuf,
}

impl FileSystemContext {
    /// Context rooted at `document_root`; nothing is created until a stage writes.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
        }
    }

    /// Folder holding the stage folders.
    pub fn document_root(&self) -> &Path {
        &self.document_root
    }
}

/// Adapter reading documents from one stage folder and writing to the next.
#[derive(Debug, Clone)]
pub struct FileSystemAdapter {
    binding: StageBinding,
    layout: LayoutConfig,
    input_subfolder: String,
    output_subfolder: String,
    batches: usize,
}

impl FileSystemAdapter {
    /// Adapter reading `stage_k` and writing `stage_{k+1}` under `layout`.
    pub fn new(binding: StageBinding, layout: LayoutConfig) -> Self {
        let input_subfolder = layout.stage_dir(binding.index());
        let output_subfolder = layout.stage_dir(binding.index() + 1);
        Self {
            binding,
            layout,
            input_subfolder,
            output_subfolder,
            batches: 0,
        }
    }

    /// Read inputs from `subfolder` instead of the stage folder.
    #[must_use]
    pub fn with_input_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.input_subfolder = subfolder.into();
        self
    }

    /// Write results to `subfolder` instead of the next stage folder.
    #[must_use]
    pub fn with_output_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.output_subfolder = subfolder.into();
        self
    }

    /// Folder inputs are read from, relative to the document root.
    pub fn input_subfolder(&self) -> &str {
        &self.input_subfolder
    }

    /// Folder results are written to, relative to the document root.
    pub fn output_subfolder(&self) -> &str {
        &self.output_subfolder
    }

    /// Document name for a result of the current batch, without extension.
    fn document_stem(
        &self,
        record: &serde_json::Value,
        result_index: usize,
        result_count: usize,
    ) -> anyhow::Result<String> {
        let id = match record.get(&self.layout.id_field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => format!("{:06}", self.batches),
        };
        if !is_plain_file_name(&id) {
            bail!("Document id `{id}` is not a plain file name");
        }

        Ok(if result_count == 1 {
            id
        } else {
            format!("{id}_{result_index}")
        })
    }
}

impl ContextAdapter<FileSystemContext> for FileSystemAdapter {
    fn binding(&self) -> &StageBinding {
        &self.binding
    }

    fn generate_inputs(&self, context: &FileSystemContext) -> anyhow::Result<Inputs> {
        let input_dir = context.document_root().join(&self.input_subfolder);
        let mut documents = Vec::new();

        for entry in fs::read_dir(&input_dir)
            .with_context(|| format!("Failed to read input folder: {}", input_dir.display()))?
        {
            let path = entry?.path();
            if self.layout.is_document(&path) {
                documents.push(path);
            } else {
                tracing::warn!("Skipping non-document file: {}", path.display());
            }
        }
        documents.sort();

        let codec: JsonCodec = *self.binding.stage().codec();
        Ok(Box::new(
            documents
                .into_iter()
                .map(move |path| read_document(&path).and_then(|json| codec.decode_input(json))),
        ))
    }

    fn process_output(
        &mut self,
        context: &mut FileSystemContext,
        result: Value,
        result_index: usize,
        result_count: usize,
    ) -> anyhow::Result<()> {
        if result_index == 1 {
            self.batches += 1;
        }
        let record = self.binding.stage().codec().encode_output(&*result)?;
        let stem = self.document_stem(&record, result_index, result_count)?;

        let output_dir = context.document_root().join(&self.output_subfolder);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output folder: {}", output_dir.display()))?;

        let path = output_dir.join(format!("{stem}.{}", self.layout.extension));
        let json = serde_json::to_vec_pretty(&record).context("Failed to serialize document")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write document: {}", path.display()))?;

        Ok(())
    }
}

/// A single normal path component, so joining it cannot leave the folder.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

fn read_document(path: &Path) -> anyhow::Result<serde_json::Value> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read document: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse document: {}", path.display()))
}

/// Factory for [`FileSystemAdapter`]s sharing one layout.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLift {
    layout: LayoutConfig,
}

impl FileSystemLift {
    /// Factory building adapters for `layout`.
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }
}

impl Lift<FileSystemContext> for FileSystemLift {
    type Adapter = FileSystemAdapter;

    fn lift(&self, stage: &DynStage, stage_index: usize, stage_count: usize) -> Result<FileSystemAdapter> {
        require_codec(stage, stage_index)?;
        Ok(FileSystemAdapter::new(
            StageBinding::new(stage.clone(), stage_index, stage_count),
            self.layout.clone(),
        ))
    }
}

/// A pipeline coupled to a document root.
pub type FileSystemPipeline = ContextualPipeline<FileSystemContext, FileSystemAdapter>;

/// Couple `pipeline` to the folder tree under `document_root`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingCodec`](crate::error::PipelineError::MissingCodec)
/// for a stage erased without `into_json_dyn`.
pub fn coupled<In, Out>(
    document_root: impl Into<PathBuf>,
    pipeline: &Pipeline<In, Out>,
    layout: LayoutConfig,
) -> Result<FileSystemPipeline> {
    ContextualPipeline::new(
        pipeline,
        FileSystemContext::new(document_root),
        &FileSystemLift::new(layout),
    )
}

/// A stage folder found under a document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFolder {
    pub index: usize,
    pub path: PathBuf,
    pub documents: usize,
}

/// List the stage folders under `document_root`, ordered by stage.
///
/// # Errors
///
/// Returns an error when the root or one of its stage folders cannot be read.
pub fn survey(document_root: &Path, layout: &LayoutConfig) -> anyhow::Result<Vec<StageFolder>> {
    let mut folders = Vec::new();

    for entry in fs::read_dir(document_root)
        .with_context(|| format!("Failed to read document root: {}", document_root.display()))?
    {
        let path = entry?.path();
        let Some(index) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| layout.stage_index(name))
        else {
            continue;
        };
        if !path.is_dir() {
            continue;
        }

        let mut documents = 0;
        for doc in fs::read_dir(&path)
            .with_context(|| format!("Failed to read stage folder: {}", path.display()))?
        {
            if layout.is_document(&doc?.path()) {
                documents += 1;
            }
        }

        folders.push(StageFolder {
            index,
            path,
            documents,
        });
    }

    folders.sort_by_key(|folder| folder.index);
    Ok(folders)
}
