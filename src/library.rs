//! Ready-made sink stages.
//!
//! Both builders turn into a pass-through [`Stage`] whose `consume` hook does
//! the work, so they can sit anywhere in a pipeline without changing what
//! flows through it.

use crate::pipeline::Stage;
use anyhow::Context as _;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::cell::RefCell;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

type Formatter<T> = Box<dyn Fn(&T) -> String>;

/// Prints every item as `prefix + content + postfix`, one per line.
pub struct ConsoleFormatter<T> {
    prefix: Option<Formatter<T>>,
    content: Option<Formatter<T>>,
    postfix: Option<Formatter<T>>,
}

impl<T> Default for ConsoleFormatter<T> {
    fn default() -> Self {
        Self {
            prefix: None,
            content: None,
            postfix: None,
        }
    }
}

impl<T: Display + 'static> ConsoleFormatter<T> {
    /// Formatter printing items with `Display`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text printed before the content.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Fn(&T) -> String + 'static) -> Self {
        self.prefix = Some(Box::new(prefix));
        self
    }

    /// Replace the default `Display` rendering of the item.
    #[must_use]
    pub fn with_content(mut self, content: impl Fn(&T) -> String + 'static) -> Self {
        self.content = Some(Box::new(content));
        self
    }

    /// Text printed after the content.
    #[must_use]
    pub fn with_postfix(mut self, postfix: impl Fn(&T) -> String + 'static) -> Self {
        self.postfix = Some(Box::new(postfix));
        self
    }

    /// The line printed for `item`.
    pub fn format(&self, item: &T) -> String {
        let mut line = String::new();
        if let Some(prefix) = &self.prefix {
            line.push_str(&prefix(item));
        }
        match &self.content {
            Some(content) => line.push_str(&content(item)),
            None => line.push_str(&item.to_string()),
        }
        if let Some(postfix) = &self.postfix {
            line.push_str(&postfix(item));
        }
        line
    }

    /// A pass-through stage printing every item to stdout.
    pub fn into_stage(self) -> Stage<T, T> {
        Stage::sink(move |item: &T| {
            writeln!(std::io::stdout().lock(), "{}", self.format(item))
                .context("Failed to write to stdout")
        })
        .named("console")
    }

    /// Like [`into_stage`](Self::into_stage) but writing to `writer`.
    pub fn into_stage_with_writer<W: Write + 'static>(self, writer: W) -> Stage<T, T> {
        let writer = RefCell::new(writer);
        Stage::sink(move |item: &T| {
            writeln!(writer.borrow_mut(), "{}", self.format(item)).context("Failed to write item")
        })
        .named("console")
    }
}

/// Writes every item as pretty JSON to the file its extractor names.
pub struct JsonFileWriter<T> {
    filename: Box<dyn Fn(&T) -> PathBuf>,
}

impl<T: Serialize + 'static> JsonFileWriter<T> {
    /// Writer naming each file with `filename`.
    pub fn new(filename: impl Fn(&T) -> PathBuf + 'static) -> Self {
        Self {
            filename: Box::new(filename),
        }
    }

    /// Destination file of `item`.
    pub fn filename(&self, item: &T) -> PathBuf {
        (self.filename)(item)
    }

    /// Render `item` as JSON indented by four spaces.
    ///
    /// # Errors
    ///
    /// Returns an error when `item` cannot be serialized.
    pub fn to_json(&self, item: &T) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        item.serialize(&mut ser).context("Failed to serialize item")?;
        String::from_utf8(buf).context("Serialized JSON is not UTF-8")
    }

    /// A pass-through stage writing every item to its file.
    pub fn into_stage(self) -> Stage<T, T> {
        Stage::sink(move |item: &T| {
            let path = self.filename(item);
            let json = self.to_json(item)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
            tracing::debug!("Wrote {}", path.display());
            Ok(())
        })
        .named("json-file")
    }
}
