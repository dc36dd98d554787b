use anyhow::Result;

use crate::logic::Playthrough;

pub mod catalog;

/// A scripted or seeded playthrough with its expectations.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// CLI name.
    pub key: &'static str,
    /// Report name.
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&mut Playthrough) -> Result<()>,
}

pub fn get_scenario(key: &str) -> Option<Scenario> {
    catalog::catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog::catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

/// Every scenario key, in catalog order.
pub fn scenario_keys() -> Vec<&'static str> {
    catalog::catalog_scenarios()
        .into_iter()
        .map(|scenario| scenario.key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_resolvable() {
        let keys = scenario_keys();
        for key in &keys {
            assert!(get_scenario(key).is_some(), "{key} not resolvable");
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
        assert!(get_scenario("nope").is_none());
        assert_eq!(list_scenarios().len(), keys.len());
    }
}
