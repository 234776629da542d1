use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Filenames consulted, in order, when resolving a [`FileMap`].
pub const MARKUP_FILES: &[&str] = &["index.html"];
pub const STYLE_FILES: &[&str] = &["style.css", "styles.css"];
pub const SCRIPT_FILES: &[&str] = &["script.js", "main.js"];

/// The unit of renderable content produced by the code generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodePayload {
    #[serde(default)]
    pub markup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl CodePayload {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style: None,
            script: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// A payload without markup means "no change" and must not be rendered.
    pub fn is_renderable(&self) -> bool {
        !self.markup.trim().is_empty()
    }
}

/// Generated output delivered as a set of named source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMap(pub BTreeMap<String, String>);

impl FileMap {
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.0.insert(name.into(), source.into());
    }

    fn first_of(&self, names: &[&str]) -> Option<&String> {
        names.iter().find_map(|name| self.0.get(*name))
    }

    /// Resolve the fixed filename lookup order into a payload.
    pub fn resolve(&self) -> CodePayload {
        CodePayload {
            markup: self.first_of(MARKUP_FILES).cloned().unwrap_or_default(),
            style: self.first_of(STYLE_FILES).cloned(),
            script: self.first_of(SCRIPT_FILES).cloned(),
        }
    }
}

impl FromIterator<(String, String)> for FileMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Inbound body accepted from the code-generation collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PayloadRequest {
    Files { files: FileMap },
    Payload(CodePayload),
}

impl PayloadRequest {
    pub fn into_payload(self) -> CodePayload {
        match self {
            Self::Files { files } => files.resolve(),
            Self::Payload(payload) => payload,
        }
    }
}

/// Opaque key correlating a subscription with coordinator notifications.
///
/// Coordinators send it either as a JSON string or a number; both compare
/// by their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for ProjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Uint(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
            Raw::Uint(n) => Self(n.to_string()),
        })
    }
}

/// Monotonically increasing token distinguishing render resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
