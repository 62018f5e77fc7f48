use crate::dest_trait::Destination;
use livescribe_core::DestinationError;
use std::collections::HashMap;

pub struct DestinationRegistry {
    factories: HashMap<String, fn() -> Box<dyn Destination>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("console", || {
            Box::new(crate::console_dest::ConsoleDestination::new())
        });
        registry.register("file", || Box::new(crate::file_dest::FileDestination::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Destination>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Destination>, DestinationError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| DestinationError::NotFound(name.to_string()))
    }

    pub fn list_destinations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
