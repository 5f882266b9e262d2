use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One completion candidate as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeclarationItem {
  /// Display name, also the key the filter matches against.
  pub name:          String,
  /// Text inserted on commit. Falls back to `name` when absent.
  #[serde(default)]
  pub value:         Option<String>,
  /// Category id used by the renderer to pick an icon.
  #[serde(default)]
  pub glyph:         Option<u32>,
  #[serde(default)]
  pub documentation: Option<String>,
}

impl DeclarationItem {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name:          name.into(),
      value:         None,
      glyph:         None,
      documentation: None,
    }
  }

  pub fn insert_text(&self) -> &str {
    self.value.as_deref().unwrap_or(&self.name)
  }
}

/// A completion reply normalized from either accepted wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
  pub matches:            Vec<DeclarationItem>,
  /// Server-told correction of the column where filter text begins.
  pub filter_start_index: Option<usize>,
}

impl CompletionReply {
  /// Decodes a reply payload, accepting both the flat shape and the
  /// `content`-wrapped shape older and newer engine revisions produce.
  pub fn from_value(value: &Value) -> Result<Self, ReplyError> {
    let raw: RawReply = serde_json::from_value(value.clone())?;
    let payload = match raw {
      RawReply::Enveloped { content } => content,
      RawReply::Flat(payload) => payload,
    };
    Ok(Self {
      matches:            payload.matches,
      filter_start_index: payload.filter_start_index,
    })
  }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReply {
  Enveloped { content: ReplyPayload },
  Flat(ReplyPayload),
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
  matches:            Vec<DeclarationItem>,
  #[serde(default, alias = "cursor_start")]
  filter_start_index: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ReplyError {
  #[error("completion reply decode failed: {0}")]
  Decode(#[from] serde_json::Error),
}
