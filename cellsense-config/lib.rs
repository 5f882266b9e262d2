//! Host-facing configuration for a completion session: which keys trigger
//! which popup, how candidates are filtered, how often the revalidation tick
//! runs, and the directive guard sets. Loaded from TOML over a built-in
//! default table.

use std::time::Duration;

use cellsense_core::{
  FilterMode,
  Key,
  KeyPhase,
  SessionOptions,
  TriggerSpec,
  TriggerTable,
  TriggerTarget,
};
use cellsense_protocol::RequestKind;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Config {
  pub request_kind:       RequestKind,
  pub filter_mode:        FilterMode,
  pub tick_interval:      Duration,
  pub triggers:           Vec<TriggerSpec>,
  pub directive_prefixes: Vec<String>,
  pub quote_templates:    Vec<String>,
}

impl Default for Config {
  fn default() -> Self {
    let decl_up = |key| TriggerSpec {
      key,
      shift: false,
      ctrl: false,
      phase: KeyPhase::Up,
      prevent_default: false,
      target: TriggerTarget::Declarations,
    };
    Self {
      request_kind:       RequestKind::Intellisense,
      filter_mode:        FilterMode::Prefix,
      tick_interval:      DEFAULT_TICK_INTERVAL,
      triggers:           vec![
        decl_up(Key::Char('.')),
        TriggerSpec {
          key:             Key::Char(' '),
          shift:           false,
          ctrl:            true,
          phase:           KeyPhase::Down,
          prevent_default: true,
          target:          TriggerTarget::Declarations,
        },
        decl_up(Key::Char('/')),
        decl_up(Key::Char('\\')),
        decl_up(Key::Char('"')),
        TriggerSpec {
          shift: true,
          ..decl_up(Key::Char('"'))
        },
        TriggerSpec {
          key:             Key::Char('('),
          shift:           true,
          ctrl:            false,
          phase:           KeyPhase::Up,
          prevent_default: false,
          target:          TriggerTarget::Signatures,
        },
        TriggerSpec {
          key:             Key::Char(')'),
          shift:           true,
          ctrl:            false,
          phase:           KeyPhase::Up,
          prevent_default: false,
          target:          TriggerTarget::Signatures,
        },
      ],
      directive_prefixes: vec!["#load".to_string(), "#r".to_string()],
      quote_templates:    vec![
        "#load \"".to_string(),
        "#r \"".to_string(),
        "#load @\"".to_string(),
        "#r @\"".to_string(),
      ],
    }
  }
}

impl Config {
  /// Parses a TOML document over the default table. Sections and fields that
  /// are absent keep their defaults; a present `[[triggers]]` array replaces
  /// the default trigger set wholesale.
  pub fn load(source: &str) -> Result<Self, ConfigLoadError> {
    let raw: ConfigRaw = toml::from_str(source)?;
    let mut config = Self::default();

    if let Some(completion) = raw.completion {
      if let Some(filter) = completion.filter {
        config.filter_mode = parse_filter_mode(&filter)?;
      }
      if let Some(kind) = completion.request_kind {
        config.request_kind = parse_request_kind(&kind)?;
      }
    }

    if let Some(revalidation) = raw.revalidation
      && let Some(interval) = revalidation.interval_ms
    {
      config.tick_interval = Duration::from_millis(interval);
    }

    if let Some(triggers) = raw.triggers {
      config.triggers = triggers
        .into_iter()
        .map(TriggerRaw::into_spec)
        .collect::<Result<_, _>>()?;
    }

    if let Some(directives) = raw.directives {
      if let Some(prefixes) = directives.prefixes {
        config.directive_prefixes = prefixes;
      }
      if let Some(templates) = directives.quote_templates {
        config.quote_templates = templates;
      }
    }

    Ok(config)
  }

  pub fn trigger_table(&self) -> TriggerTable {
    let mut table = TriggerTable::new(
      self.directive_prefixes.clone(),
      self.quote_templates.clone(),
    );
    for spec in &self.triggers {
      table.add(spec.clone());
    }
    table
  }

  pub fn session_options(&self) -> SessionOptions {
    SessionOptions {
      triggers:     self.trigger_table(),
      filter_mode:  self.filter_mode,
      request_kind: self.request_kind,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
  completion:   Option<CompletionRaw>,
  revalidation: Option<RevalidationRaw>,
  triggers:     Option<Vec<TriggerRaw>>,
  directives:   Option<DirectivesRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompletionRaw {
  filter:       Option<String>,
  request_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RevalidationRaw {
  interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TriggerRaw {
  key:             String,
  #[serde(default)]
  shift:           bool,
  #[serde(default)]
  ctrl:            bool,
  phase:           Option<String>,
  #[serde(default)]
  prevent_default: bool,
  target:          Option<String>,
}

impl TriggerRaw {
  fn into_spec(self) -> Result<TriggerSpec, ConfigLoadError> {
    Ok(TriggerSpec {
      key:             parse_key(&self.key)?,
      shift:           self.shift,
      ctrl:            self.ctrl,
      phase:           match self.phase.as_deref() {
        None | Some("up") => KeyPhase::Up,
        Some("down") => KeyPhase::Down,
        Some(other) => return Err(ConfigLoadError::UnknownPhase(other.to_string())),
      },
      prevent_default: self.prevent_default,
      target:          match self.target.as_deref() {
        None | Some("declarations") => TriggerTarget::Declarations,
        Some("signatures") => TriggerTarget::Signatures,
        Some(other) => return Err(ConfigLoadError::UnknownTarget(other.to_string())),
      },
    })
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectivesRaw {
  prefixes:        Option<Vec<String>>,
  quote_templates: Option<Vec<String>>,
}

fn parse_key(name: &str) -> Result<Key, ConfigLoadError> {
  let mut chars = name.chars();
  if let (Some(ch), None) = (chars.next(), chars.next()) {
    return Ok(Key::Char(ch));
  }
  match name {
    "space" => Ok(Key::Char(' ')),
    "enter" => Ok(Key::Enter),
    "tab" => Ok(Key::Tab),
    "escape" => Ok(Key::Escape),
    "backspace" => Ok(Key::Backspace),
    "left" => Ok(Key::Left),
    "right" => Ok(Key::Right),
    "up" => Ok(Key::Up),
    "down" => Ok(Key::Down),
    "pageup" => Ok(Key::PageUp),
    "pagedown" => Ok(Key::PageDown),
    other => Err(ConfigLoadError::UnknownKey(other.to_string())),
  }
}

fn parse_filter_mode(name: &str) -> Result<FilterMode, ConfigLoadError> {
  match name {
    "prefix" => Ok(FilterMode::Prefix),
    "contains" => Ok(FilterMode::Contains),
    other => Err(ConfigLoadError::UnknownFilterMode(other.to_string())),
  }
}

fn parse_request_kind(name: &str) -> Result<RequestKind, ConfigLoadError> {
  match name {
    "intellisense_request" => Ok(RequestKind::Intellisense),
    "complete_request" => Ok(RequestKind::Complete),
    other => Err(ConfigLoadError::UnknownRequestKind(other.to_string())),
  }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("failed to parse configuration: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error("unknown key name: {0}")]
  UnknownKey(String),
  #[error("unknown trigger phase: {0}")]
  UnknownPhase(String),
  #[error("unknown trigger target: {0}")]
  UnknownTarget(String),
  #[error("unknown filter mode: {0}")]
  UnknownFilterMode(String),
  #[error("unknown request kind: {0}")]
  UnknownRequestKind(String),
}
