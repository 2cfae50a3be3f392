use std::fmt;

/// Error kind for plugin and adapter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing required argument, unknown plugin, malformed field definition.
    Config,
    /// Credential exchange failed.
    Auth,
    /// Network failure or non-success status. Never retried.
    Transport,
    /// Remote payload does not have the expected shape.
    Decode,
    /// Type coercion of a value or a parsed default failed.
    Conversion,
    /// Settings key absent or duplicated, or the settings table is unusable.
    Settings,
    /// Value could not be handed to the host engine.
    Adapter,
}

/// Plugin error, returned by all plugin trait methods.
#[derive(Debug, Clone)]
pub struct PluginError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PluginError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Auth, message: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transport, message: msg.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: msg.into() }
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Conversion, message: msg.into() }
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Settings, message: msg.into() }
    }

    pub fn adapter(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Adapter, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PluginError {}
