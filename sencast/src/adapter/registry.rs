//! Adapter registry: name to factory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::command::CommandAdapter;
use super::manifest::{ManifestAdapter, MANIFEST_ADAPTER};
use super::Adapter;
use crate::config::{ConfigurationError, HindcastConfig};

/// Adapter names known to a default registry.
pub const KNOWN_ADAPTERS: [&str; 5] = ["QLRGB", "QLSINGLEBAND", "GEOTIFF", "DATALAKES", MANIFEST_ADAPTER];

/// Builds an adapter for a name from the run configuration.
pub type AdapterFactory =
    Arc<dyn Fn(&str, &HindcastConfig) -> Result<Arc<dyn Adapter>, ConfigurationError> + Send + Sync>;

/// Maps adapter names to factories.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command adapters for the known export names plus the manifest.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in KNOWN_ADAPTERS.iter().filter(|n| **n != MANIFEST_ADAPTER) {
            registry.register(name, |name, config| {
                Ok(Arc::new(CommandAdapter::from_config(name, config)?) as Arc<dyn Adapter>)
            });
        }
        registry.register_instance(Arc::new(ManifestAdapter::new()));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&str, &HindcastConfig) -> Result<Arc<dyn Adapter>, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_uppercase(), Arc::new(factory));
        self
    }

    pub fn register_instance(&mut self, adapter: Arc<dyn Adapter>) -> &mut Self {
        let name = adapter.name().to_string();
        self.register(&name, move |_, _| Ok(Arc::clone(&adapter)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_uppercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        name: &str,
        config: &HindcastConfig,
    ) -> Result<Arc<dyn Adapter>, ConfigurationError> {
        let key = name.to_uppercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| ConfigurationError::UnknownAdapter(key.clone()))?;
        factory(&key, config)
    }

    /// Builds the configured adapter chain in order.
    ///
    /// Every adapter input must name a configured processor.
    pub fn build_chain(
        &self,
        config: &HindcastConfig,
    ) -> Result<Vec<Arc<dyn Adapter>>, ConfigurationError> {
        let processors = &config.general.processors;
        let mut chain = Vec::with_capacity(config.general.adapters.len());

        for name in &config.general.adapters {
            let adapter = self.create(name, config)?;
            if let Some(missing) = adapter.inputs().iter().find(|i| !processors.contains(i)) {
                return Err(ConfigurationError::InvalidValue {
                    section: "general".to_string(),
                    key: "adapters".to_string(),
                    value: config.general.adapters.join(", "),
                    reason: format!(
                        "{} needs {} which is not in the processor list",
                        adapter.name(),
                        missing
                    ),
                });
            }
            chain.push(adapter);
        }

        Ok(chain)
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(adapters: &str, sections: &str) -> HindcastConfig {
        let ini = format!(
            "[general]\n\
             wkt = POLYGON ((6.1 46.2, 6.9 46.2, 6.9 46.5, 6.1 46.5, 6.1 46.2))\n\
             sensor = OLCI\n\
             start = 2021-07-01\n\
             end = 2021-07-02\n\
             processors = IDEPIX, C2RCC\n\
             adapters = {}\n\
             {}",
            adapters, sections
        );
        HindcastConfig::from_ini_str(&ini, Path::new("/")).unwrap()
    }

    #[test]
    fn test_defaults_know_all_names() {
        let registry = AdapterRegistry::with_defaults();
        for name in KNOWN_ADAPTERS {
            assert!(registry.contains(name), "{} missing", name);
        }
    }

    #[test]
    fn test_manifest_needs_no_section() {
        let registry = AdapterRegistry::with_defaults();
        let chain = registry.build_chain(&config("MANIFEST", "")).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "MANIFEST");
    }

    #[test]
    fn test_unknown_adapter() {
        let registry = AdapterRegistry::with_defaults();
        match registry.build_chain(&config("WMS", "")) {
            Err(ConfigurationError::UnknownAdapter(name)) => assert_eq!(name, "WMS"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("unknown adapter accepted"),
        }
    }

    #[test]
    fn test_input_must_be_configured_processor() {
        let registry = AdapterRegistry::with_defaults();
        let config = config(
            "QLRGB",
            "[adapter.QLRGB]\ncommand = ql {inputs} {output}\ninputs = POLYMER\n",
        );
        match registry.build_chain(&config) {
            Err(ConfigurationError::InvalidValue { key, reason, .. }) => {
                assert_eq!(key, "adapters");
                assert!(reason.contains("POLYMER"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("adapter with unknown input accepted"),
        }
    }

    #[test]
    fn test_command_adapter_requires_command() {
        let registry = AdapterRegistry::with_defaults();
        assert!(matches!(
            registry.build_chain(&config("GEOTIFF", "")),
            Err(ConfigurationError::MissingKey { .. })
        ));
    }
}
