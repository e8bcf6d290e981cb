//! Engine registry for creating search engines by name

use super::bing::Bing;
use super::duckduckgo::DuckDuckGo;
use super::serper::Serper;
use super::traits::SearchEngine;
use crate::config::Settings;
use crate::error::{Result, SearchError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::info;

type Factory = fn(&Settings) -> Result<Box<dyn SearchEngine>>;

static REGISTRY: Lazy<EngineRegistry> = Lazy::new(EngineRegistry::builtin);

/// Name → factory table of every available engine
pub struct EngineRegistry {
    /// Factories by engine name
    factories: HashMap<&'static str, Factory>,
    /// Engine shortcuts (e.g., "g" -> "serper")
    shortcuts: HashMap<&'static str, &'static str>,
}

impl EngineRegistry {
    /// The process-wide registry
    pub fn global() -> &'static EngineRegistry {
        &REGISTRY
    }

    fn builtin() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
            shortcuts: HashMap::new(),
        };

        registry.register("serper", &["g", "google"], |settings| {
            Ok(Box::new(Serper::with_settings(settings)?))
        });
        registry.register("duckduckgo", &["ddg"], |settings| {
            Ok(Box::new(DuckDuckGo::with_settings(settings)?))
        });
        registry.register("bing", &["bi"], |settings| {
            Ok(Box::new(Bing::with_settings(settings)?))
        });

        registry
    }

    fn register(&mut self, name: &'static str, shortcuts: &[&'static str], factory: Factory) {
        self.factories.insert(name, factory);
        for shortcut in shortcuts {
            self.shortcuts.insert(shortcut, name);
        }
    }

    /// Resolve a name or shortcut to the engine's canonical name
    pub fn resolve_name(&self, name: &str) -> Option<&'static str> {
        let name = name.trim().to_lowercase();
        self.factories
            .get_key_value(name.as_str())
            .map(|(canonical, _)| *canonical)
            .or_else(|| self.shortcuts.get(name.as_str()).copied())
    }

    /// Create an engine by name or shortcut
    pub fn create(&self, name: &str, settings: &Settings) -> Result<Box<dyn SearchEngine>> {
        let canonical = self
            .resolve_name(name)
            .ok_or_else(|| SearchError::Configuration(format!("unknown engine: {}", name)))?;

        let engine = (self.factories[canonical])(settings)?;
        info!("Created engine: {}", canonical);
        Ok(engine)
    }

    /// Canonical names of every registered engine, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(
            EngineRegistry::global().names(),
            vec!["bing", "duckduckgo", "serper"]
        );
        assert_eq!(EngineRegistry::global().len(), 3);
    }

    #[test]
    fn test_resolve_shortcuts() {
        let registry = EngineRegistry::global();
        assert_eq!(registry.resolve_name("g"), Some("serper"));
        assert_eq!(registry.resolve_name("Google"), Some("serper"));
        assert_eq!(registry.resolve_name("ddg"), Some("duckduckgo"));
        assert_eq!(registry.resolve_name(" bi "), Some("bing"));
        assert_eq!(registry.resolve_name("yahoo"), None);
    }

    #[test]
    fn test_create() {
        let mut settings = Settings::default();
        settings.serper.api_key = Some("key".to_string());

        let engine = EngineRegistry::global().create("ddg", &settings).unwrap();
        assert_eq!(engine.name(), "duckduckgo");

        let engine = EngineRegistry::global().create("g", &settings).unwrap();
        assert_eq!(engine.name(), "serper");
        assert!(engine.about().require_api_key);

        let engine = EngineRegistry::global().create("bing", &settings).unwrap();
        assert!(engine.about().file_discovery);
        assert!(!engine.is_closed());
    }

    #[test]
    fn test_create_failures() {
        let settings = Settings::default();

        assert!(matches!(
            EngineRegistry::global().create("altavista", &settings),
            Err(SearchError::Configuration(_))
        ));
        assert!(matches!(
            EngineRegistry::global().create("serper", &settings),
            Err(SearchError::Configuration(_))
        ));
    }
}
