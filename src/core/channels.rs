//! Channel data store.
//!
//! Holds the values exchanged between actors. Values are addressed by
//! name, or by a dotted path wrapped in markers (`@facts.os.name@`) to
//! reach into nested mappings.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::ChannelDecl;

/// Marker wrapped around a channel path reference
pub const VARIABLE_MARKER: char = '@';

/// Top-level channel name to value
pub type ChannelData = Map<String, Value>;

/// Channel lookup and assignment errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("Missing channel(s) {}", .0.join(","))]
    MissingChannels(Vec<String>),

    #[error("Failed to resolve channel variable '{spec}': {reason}")]
    Lookup { spec: String, reason: String },

    #[error("Invalid channel variable to assign to: '{0}'")]
    InvalidTarget(String),

    #[error("Attempt to overwrite channel '{0}'")]
    MutabilityViolation(String),
}

impl ChannelError {
    /// True for every error caused by a name or path that can't be resolved
    pub fn is_lookup(&self) -> bool {
        !matches!(self, Self::MutabilityViolation(_))
    }
}

/// Store for channel data during a single run
#[derive(Debug, Clone, Default)]
pub struct ChannelManager {
    data: ChannelData,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with data
    pub fn with_data(data: ChannelData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &ChannelData {
        &self.data
    }

    pub fn into_data(self) -> ChannelData {
        self.data
    }

    /// Resolve a value.
    ///
    /// Marker-wrapped specs are looked up in the store; anything else is
    /// returned unchanged as a string literal.
    pub fn resolve(&self, spec: &str) -> Result<Value, ChannelError> {
        let Some(path) = variable_path(spec) else {
            return Ok(Value::String(spec.to_string()));
        };

        let lookup_error = |reason: &str| ChannelError::Lookup {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self
            .data
            .get(first)
            .ok_or_else(|| lookup_error(&format!("no channel named '{}'", first)))?;

        for segment in segments {
            let mapping = current
                .as_object()
                .ok_or_else(|| lookup_error(&format!("expected a map before '{}'", segment)))?;
            current = mapping
                .get(segment)
                .ok_or_else(|| lookup_error(&format!("no entry named '{}'", segment)))?;
        }

        Ok(current.clone())
    }

    /// Get the channels named by the declarations
    pub fn get_filtered(&self, channels: &[ChannelDecl]) -> Result<ChannelData, ChannelError> {
        filter_channels(channels, &self.data)
    }

    /// Assign the declared channels found in `data`.
    ///
    /// Existing channels are never overwritten. The assignment is not
    /// transactional: when a conflict is hit, channels assigned before it
    /// in the same call are kept and the remaining ones are skipped.
    /// Channels are assigned in declaration order.
    pub fn assign_filtered(
        &mut self,
        channels: &[ChannelDecl],
        data: &ChannelData,
    ) -> Result<(), ChannelError> {
        let mut filtered = filter_channels(channels, data)?;

        for channel in channels {
            // a name declared twice was already taken on its first occurrence
            let Some(value) = filtered.remove(&channel.name) else {
                continue;
            };
            if self.data.contains_key(&channel.name) {
                return Err(ChannelError::MutabilityViolation(channel.name.clone()));
            }
            self.data.insert(channel.name.clone(), value);
        }

        Ok(())
    }

    /// Assign a value to a marker-wrapped path, replacing whatever was there.
    ///
    /// For nested paths the whole structure under the top-level channel is
    /// rebuilt; existing siblings are discarded.
    pub fn assign_to_variable(&mut self, spec: &str, value: Value) -> Result<(), ChannelError> {
        let path = variable_path(spec).ok_or_else(|| ChannelError::InvalidTarget(spec.to_string()))?;
        if path.is_empty() {
            return Err(ChannelError::InvalidTarget(spec.to_string()));
        }

        let mut segments = path.split('.');
        let root = segments.next().unwrap_or_default().to_string();
        let nested: Vec<&str> = segments.collect();

        let built = nested.iter().rev().fold(value, |inner, key| {
            let mut mapping = Map::new();
            mapping.insert((*key).to_string(), inner);
            Value::Object(mapping)
        });

        self.data.insert(root, built);
        Ok(())
    }
}

/// Interior of a marker-wrapped spec, or `None` for a literal
fn variable_path(spec: &str) -> Option<&str> {
    if spec.starts_with(VARIABLE_MARKER) && spec.ends_with(VARIABLE_MARKER) {
        Some(spec.trim_matches(VARIABLE_MARKER))
    } else {
        None
    }
}

fn filter_channels(channels: &[ChannelDecl], data: &ChannelData) -> Result<ChannelData, ChannelError> {
    let mut result = ChannelData::new();
    let mut missing = Vec::new();

    for channel in channels {
        match data.get(&channel.name) {
            Some(value) => {
                result.insert(channel.name.clone(), value.clone());
            }
            None => missing.push(channel.name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(ChannelError::MissingChannels(missing));
    }

    Ok(result)
}
