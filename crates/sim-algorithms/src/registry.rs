use std::collections::HashMap;
use std::sync::Arc;

use sim_types::SimError;

use crate::algorithm::NodeAlgorithm;
use crate::flooding::FloodingLeaderElectionAlgorithm;

/// Constructs a fresh algorithm instance on demand; registered once per id.
pub type AlgorithmFactory = Arc<dyn Fn() -> Box<dyn NodeAlgorithm> + Send + Sync>;

/// String-keyed registry resolving an `algorithmId` to a factory.
pub struct AlgorithmRegistry {
    factories: HashMap<String, AlgorithmFactory>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in `flooding-leader-election`
    /// algorithm.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("flooding-leader-election", || {
            Box::new(FloodingLeaderElectionAlgorithm::new())
        });
        registry
    }

    pub fn register<F>(&mut self, algorithm_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NodeAlgorithm> + Send + Sync + 'static,
    {
        self.factories.insert(algorithm_id.into(), Arc::new(factory));
    }

    pub fn instantiate(&self, algorithm_id: &str) -> Result<Box<dyn NodeAlgorithm>, SimError> {
        self.factories
            .get(algorithm_id)
            .map(|factory| factory())
            .ok_or_else(|| {
                SimError::InvalidArgument(format!("unknown algorithm id: {algorithm_id}"))
            })
    }

    pub fn contains(&self, algorithm_id: &str) -> bool {
        self.factories.contains_key(algorithm_id)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_flooding_algorithm() {
        let registry = AlgorithmRegistry::with_builtins();
        assert!(registry.instantiate("flooding-leader-election").is_ok());
    }

    #[test]
    fn unknown_algorithm_is_invalid_argument() {
        let registry = AlgorithmRegistry::with_builtins();
        let err = registry.instantiate("does-not-exist").unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }

    #[test]
    fn custom_algorithms_can_be_registered() {
        let mut registry = AlgorithmRegistry::new();
        registry.register("flooding-leader-election", || {
            Box::new(FloodingLeaderElectionAlgorithm::new())
        });
        assert!(registry.contains("flooding-leader-election"));
    }
}
