//! Platform-pattern rule sets.
//!
//! Most manifest sections (build commands, artifacts, dependency lists,
//! global env) are maps keyed by platform patterns. YAML document order is
//! semantically significant: rule selection takes the FIRST matching
//! pattern, while global env merging folds ALL matching patterns in order.
//! A plain `HashMap` would destroy that order, so rules are kept as an
//! ordered pattern/value list with a hand-written map deserializer.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::core::platform::pattern_matches;

/// An ordered map from platform pattern to a rule value.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet<T> {
    rules: Vec<(String, T)>,
}

impl<T> RuleSet<T> {
    /// Create an empty rule set.
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// Append a rule. Later insertions keep their position; patterns are
    /// not de-duplicated.
    pub fn push(&mut self, pattern: impl Into<String>, value: T) {
        self.rules.push((pattern.into(), value));
    }

    /// Select the value of the first pattern matching `platform`.
    pub fn select_for(&self, platform: &str) -> Option<&T> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern_matches(pattern, platform))
            .map(|(_, value)| value)
    }

    /// Iterate all rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.rules.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// Iterate the patterns in declaration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        RuleSet::new()
    }
}

impl<T> FromIterator<(String, T)> for RuleSet<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        RuleSet {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'de, T> Deserialize<'de> for RuleSet<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleSetVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for RuleSetVisitor<T>
        where
            T: Deserialize<'de>,
        {
            type Value = RuleSet<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by platform patterns")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut rules = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((pattern, value)) = access.next_entry::<String, T>()? {
                    rules.push((pattern, value));
                }
                Ok(RuleSet { rules })
            }
        }

        deserializer.deserialize_map(RuleSetVisitor(PhantomData))
    }
}
