//! Document decoding and parsing configuration.

use serde::{Deserialize, Serialize};

/// Encoding used when neither the response nor the document declares one
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// How response bodies are handed to the HTML parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Full document: missing `html`/`head`/`body` are synthesised
    #[default]
    Document,
    /// Fragment: content is parsed as a snippet, no document skeleton
    Fragment,
}

/// Configuration for turning response bytes into a parsed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Encoding label used when nothing else declares one
    pub default_encoding: String,
    /// Look for a `<meta>` charset declaration when no encoding is declared
    pub sniff_meta_charset: bool,
    /// Parse as a whole document or as a fragment
    pub mode: ParseMode,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            default_encoding: DEFAULT_ENCODING.to_string(),
            sniff_meta_charset: true,
            mode: ParseMode::Document,
        }
    }
}

impl DocumentConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback encoding label
    #[must_use]
    pub fn with_default_encoding(mut self, label: impl Into<String>) -> Self {
        self.default_encoding = label.into();
        self
    }

    /// Enable or disable `<meta charset>` sniffing
    #[must_use]
    pub const fn with_meta_sniffing(mut self, enabled: bool) -> Self {
        self.sniff_meta_charset = enabled;
        self
    }

    /// Set the parse mode
    #[must_use]
    pub const fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }
}
