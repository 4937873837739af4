//! Two-namespace result cache: constants by name, indexed results by (indicator, year, country).
//! Unavailable results are cached like any other; only a full reset forgets anything.

use std::collections::HashMap;

use crate::data::Value;
use crate::indicators::graph::{Constant, Indicator};

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    constants: HashMap<Constant, Value>,
    indexed: HashMap<Indicator, HashMap<i32, HashMap<String, Value>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` is a miss; `Some(None)` is a cached "unavailable".
    pub fn get_constant(&self, constant: Constant) -> Option<Value> {
        self.constants.get(&constant).copied()
    }

    pub fn put_constant(&mut self, constant: Constant, value: Value) {
        self.constants.insert(constant, value);
    }

    /// Every cached constant, in declaration order.
    pub fn constants(&self) -> Vec<(Constant, Value)> {
        Constant::ALL
            .into_iter()
            .filter_map(|c| self.constants.get(&c).map(|v| (c, *v)))
            .collect()
    }

    pub fn get(&self, indicator: Indicator, year: i32, country: &str) -> Option<Value> {
        self.indexed
            .get(&indicator)?
            .get(&year)?
            .get(country)
            .copied()
    }

    pub fn put(&mut self, indicator: Indicator, year: i32, country: &str, value: Value) {
        self.indexed
            .entry(indicator)
            .or_default()
            .entry(year)
            .or_default()
            .insert(country.to_string(), value);
    }

    pub fn reset(&mut self) {
        self.constants.clear();
        self.indexed.clear();
    }

    /// Total number of cached entries across both namespaces.
    pub fn len(&self) -> usize {
        self.constants.len()
            + self
                .indexed
                .values()
                .flat_map(|years| years.values())
                .map(HashMap::len)
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguishes_miss_from_cached_unavailable() {
        let mut cache = ResultCache::new();
        assert_eq!(cache.get(Indicator::ROpenT, 2020, "X"), None);

        cache.put(Indicator::ROpenT, 2020, "X", None);
        cache.put(Indicator::ROpenT, 2020, "CN", Some(0.5));
        assert_eq!(cache.get(Indicator::ROpenT, 2020, "X"), Some(None));
        assert_eq!(cache.get(Indicator::ROpenT, 2020, "CN"), Some(Some(0.5)));
        assert_eq!(cache.get(Indicator::ROpenT, 2021, "CN"), None);
        assert_eq!(cache.get(Indicator::POpenT, 2020, "CN"), None);
    }

    #[test]
    fn reset_clears_both_namespaces() {
        let mut cache = ResultCache::new();
        cache.put_constant(Constant::ROpenT1, Some(0.7));
        cache.put_constant(Constant::POpenT1, None);
        cache.put(Indicator::R, 2020, "CN", Some(1.0));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get_constant(Constant::POpenT1), Some(None));

        cache.reset();

        assert!(cache.is_empty());
        assert_eq!(cache.get_constant(Constant::ROpenT1), None);
        assert_eq!(cache.get(Indicator::R, 2020, "CN"), None);
    }
}
