//! Runtime configuration, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::terminal::FALLBACK_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotusConfig {
    /// Share parsed stylesheets across renders and contexts.
    pub css_cache: bool,
    /// Periodic tick for animations or clocks. Off by default.
    pub tick_interval_ms: Option<u64>,
    pub resize_poll_ms: u64,
    pub input_poll_ms: u64,
    /// Viewport used when the terminal size cannot be read.
    pub fallback_width: u16,
    pub fallback_height: u16,
}

impl Default for LotusConfig {
    fn default() -> Self {
        Self {
            css_cache: true,
            tick_interval_ms: None,
            resize_poll_ms: 250,
            input_poll_ms: 50,
            fallback_width: FALLBACK_SIZE.0,
            fallback_height: FALLBACK_SIZE.1,
        }
    }
}

impl LotusConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn fallback_size(&self) -> (u16, u16) {
        (self.fallback_width, self.fallback_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LotusError;

    #[test]
    fn test_defaults() {
        let c = LotusConfig::default();
        assert!(c.css_cache);
        assert_eq!(c.tick_interval_ms, None);
        assert_eq!(c.resize_poll_ms, 250);
        assert_eq!(c.input_poll_ms, 50);
        assert_eq!(c.fallback_size(), (80, 24));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c = LotusConfig::from_json(r#"{ "css_cache": false, "tick_interval_ms": 100 }"#).unwrap();
        assert!(!c.css_cache);
        assert_eq!(c.tick_interval_ms, Some(100));
        assert_eq!(c.resize_poll_ms, 250);
        assert_eq!(LotusConfig::from_json("{}").unwrap(), LotusConfig::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = LotusConfig::from_json("{ css_cache: ").unwrap_err();
        assert!(matches!(err, LotusError::Config(_)));
    }
}
