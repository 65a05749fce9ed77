use serde_json::Value;
use thiserror::Error;

/// Glyph shown when a package has no usable remote icon.
pub const FALLBACK_ICON_GLYPH: &str = "\u{E7B8}";
/// Glyph attached to actions that start an external process.
pub const INSTALL_ICON_GLYPH: &str = "\u{E896}";

/// One user search intent, ordered by the sequence number assigned at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    seq: u64,
}

impl Query {
    pub fn new(text: impl Into<String>, seq: u64) -> Self {
        Self {
            text: text.into(),
            seq,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub id: String,
    pub version: String,
    pub icon_url: Option<String>,
}

impl PackageRecord {
    pub fn new(id: &str, version: &str, icon_url: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            icon_url: icon_url.map(str::to_string),
        }
    }
}

/// Package entry as it arrived on the wire. Every field is optional so that a
/// bad entry can be skipped without failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPackageRecord {
    pub id: Option<String>,
    pub version: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record has no id")]
    MissingId,
    #[error("record '{id}' has no version")]
    MissingVersion { id: String },
}

impl RawPackageRecord {
    pub fn new(id: Option<&str>, version: Option<&str>, icon_url: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            version: version.map(str::to_string),
            icon_url: icon_url.map(str::to_string),
        }
    }

    /// Reads the `id`, `version` and `iconUrl` string properties of one
    /// element of the search response. Non-string values count as absent.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: text("id"),
            version: text("version"),
            icon_url: text("iconUrl"),
        }
    }

    pub fn validate(self) -> Result<PackageRecord, MalformedRecord> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(MalformedRecord::MissingId)?;
        let Some(version) = self.version else {
            return Err(MalformedRecord::MissingVersion { id });
        };
        Ok(PackageRecord {
            id,
            version,
            icon_url: self.icon_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Glyph(&'static str),
    Remote(String),
}

impl Icon {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Glyph(glyph) => glyph,
            Self::Remote(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    CopyText {
        text: String,
    },
    RunProcess {
        command_line: String,
        visible_console: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub icon: Option<&'static str>,
    pub kind: ActionKind,
}

impl Action {
    pub fn copy_text(label: &str, text: String) -> Self {
        Self {
            label: label.to_string(),
            icon: None,
            kind: ActionKind::CopyText { text },
        }
    }

    pub fn run_process(label: &str, command_line: String, visible_console: bool) -> Self {
        Self {
            label: label.to_string(),
            icon: Some(INSTALL_ICON_GLYPH),
            kind: ActionKind::RunProcess {
                command_line,
                visible_console,
            },
        }
    }

    /// The text this action copies or the command line it runs.
    pub fn payload(&self) -> &str {
        match &self.kind {
            ActionKind::CopyText { text } => text,
            ActionKind::RunProcess { command_line, .. } => command_line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub title: String,
    pub subtitle: String,
    pub icon: Icon,
    pub primary: Action,
    pub secondary: Vec<Action>,
}

impl DisplayItem {
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }
}

/// What the renderer sees: loading and error flags plus the current batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub is_loading: bool,
    pub is_error: bool,
    pub results: Vec<DisplayItem>,
}

impl PipelineState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading_from(previous: &Self) -> Self {
        Self {
            is_loading: true,
            is_error: false,
            results: previous.results.clone(),
        }
    }

    pub fn loaded(results: Vec<DisplayItem>) -> Self {
        Self {
            is_loading: false,
            is_error: false,
            results,
        }
    }

    pub fn failed() -> Self {
        Self {
            is_loading: false,
            is_error: true,
            results: Vec::new(),
        }
    }
}
