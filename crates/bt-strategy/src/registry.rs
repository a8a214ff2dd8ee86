use crate::strategy::Strategy;

type StrategyFactory = Box<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName(String),
    UnknownStrategy(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => write!(f, "strategy '{name}' is already registered"),
            RegistryError::UnknownStrategy(name) => write!(f, "no strategy named '{name}' is registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

struct Entry {
    name: String,
    factory: StrategyFactory,
}

/// A named catalogue of strategy factories, so a host process can resolve a
/// config's `strategy.type` string to a constructor without a match
/// statement growing at every call site. The reference MA-crossover
/// strategy is the only one spec.md requires; this exists so adding a
/// second strategy later doesn't mean touching the driver.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: Vec<Entry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.iter().any(|e| e.name == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.entries.push(Entry {
            name,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.factory)())
            .ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MovingAverageCrossover;

    #[test]
    fn register_and_instantiate_round_trips() {
        let mut reg = StrategyRegistry::new();
        reg.register("ma_crossover", || {
            Box::new(MovingAverageCrossover::new(5, 20, 10, vec!["AAA".into()]))
        })
        .unwrap();

        let strategy = reg.instantiate("ma_crossover").unwrap();
        assert_eq!(strategy.spec().name, "moving_average_crossover");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = StrategyRegistry::new();
        reg.register("a", || Box::new(MovingAverageCrossover::new(5, 20, 10, vec![])))
            .unwrap();
        let err = reg.register("a", || Box::new(MovingAverageCrossover::new(5, 20, 10, vec![])));
        assert_eq!(err, Err(RegistryError::DuplicateName("a".to_string())));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let reg = StrategyRegistry::new();
        match reg.instantiate("ghost") {
            Err(e) => assert_eq!(e, RegistryError::UnknownStrategy("ghost".to_string())),
            Ok(_) => panic!("expected UnknownStrategy error"),
        }
    }
}
