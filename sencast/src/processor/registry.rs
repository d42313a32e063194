//! Processor registry: name to factory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::command::CommandProcessor;
use super::Processor;
use crate::config::{ConfigurationError, HindcastConfig};

/// Processor names known to a default registry.
pub const KNOWN_PROCESSORS: [&str; 10] = [
    "IDEPIX",
    "C2RCC",
    "POLYMER",
    "ACOLITE",
    "MPH",
    "OC3",
    "MDN",
    "FORELULE",
    "SECCHIDEPTH",
    "PRIMARYPRODUCTION",
];

/// Builds a processor for a name from the run configuration.
pub type ProcessorFactory =
    Arc<dyn Fn(&str, &HindcastConfig) -> Result<Arc<dyn Processor>, ConfigurationError> + Send + Sync>;

/// Maps processor names to factories.
///
/// Populated once at startup; unknown names are configuration errors.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: BTreeMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every known name backed by [`CommandProcessor`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in KNOWN_PROCESSORS {
            registry.register(name, |name, config| {
                Ok(Arc::new(CommandProcessor::from_config(name, config)?) as Arc<dyn Processor>)
            });
        }
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&str, &HindcastConfig) -> Result<Arc<dyn Processor>, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_uppercase(), Arc::new(factory));
        self
    }

    /// Registers a ready-made processor under its own name.
    pub fn register_instance(&mut self, processor: Arc<dyn Processor>) -> &mut Self {
        let name = processor.name().to_string();
        self.register(&name, move |_, _| Ok(Arc::clone(&processor)))
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
    ) -> Result<Arc<dyn Processor>, ConfigurationError> {
        let key = name.to_uppercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| ConfigurationError::UnknownProcessor(key.clone()))?;
        factory(&key, config)
    }

    /// Builds the configured chain in order.
    ///
    /// Every processor's requirements must appear earlier in the chain.
    pub fn build_chain(
        &self,
        config: &HindcastConfig,
    ) -> Result<Vec<Arc<dyn Processor>>, ConfigurationError> {
        let names = &config.general.processors;
        let mut chain: Vec<Arc<dyn Processor>> = Vec::with_capacity(names.len());

        for name in names {
            let processor = self.create(name, config)?;
            for required in processor.requires() {
                if !chain.iter().any(|p| p.name() == required) {
                    return Err(ConfigurationError::InvalidValue {
                        section: "general".to_string(),
                        key: "processors".to_string(),
                        value: names.join(", "),
                        reason: format!(
                            "{} requires {} earlier in the chain",
                            processor.name(),
                            required
                        ),
                    });
                }
            }
            chain.push(processor);
        }

        Ok(chain)
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
