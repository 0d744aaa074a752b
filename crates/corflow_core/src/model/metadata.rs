//! Layered metadata store attached to every entity.
//!
//! # Responsibility
//! - Store `division -> key -> values` with insertion order at both levels.
//! - Rebuild grouped records (speakers, participants) from flat keys.
//!
//! # Invariants
//! - Value lists only shrink through `remove_meta`.
//! - `set_meta` with an out-of-range position appends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Division shared by every file format.
pub const DIVISION_OMNI: &str = "omni";
/// Division reserved for internal flags.
pub const DIVISION_TECH: &str = "tech";
/// Default separator for grouped keys such as `spk_name`.
pub const DEFAULT_META_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Division {
    name: String,
    entries: Vec<(String, Vec<String>)>,
}

impl Division {
    fn values(&self, key: &str) -> Option<&Vec<String>> {
        self.entries
            .iter()
            .find(|(current, _)| current == key)
            .map(|(_, values)| values)
    }
}

/// One record rebuilt by `Metadata::meta_group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaGroup {
    /// Value of the `name` field, or `prefix + counter` when absent.
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Two-level ordered metadata mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    divisions: Vec<Division>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.divisions.is_empty()
    }

    pub fn has_division(&self, division: &str) -> bool {
        self.division(division).is_some()
    }

    /// Stores `value` under `division/key`.
    ///
    /// `position = None` (or out of range) appends; otherwise the value at
    /// `position` is overwritten.
    pub fn set_meta(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        division: &str,
        position: Option<usize>,
    ) {
        let key = key.into();
        let value = value.into();
        let division = self.division_mut_or_insert(division);
        match division.entries.iter_mut().find(|(current, _)| *current == key) {
            Some((_, values)) => match position {
                Some(index) if index < values.len() => values[index] = value,
                _ => values.push(value),
            },
            None => division.entries.push((key, vec![value])),
        }
    }

    /// First value for `key`, or `empty` when missing or blank.
    ///
    /// Falls back to `omni` when `division` does not exist.
    pub fn meta<'a>(&'a self, key: &str, division: &str, empty: &'a str) -> &'a str {
        match self.lookup(key, division).and_then(|values| values.first()) {
            Some(value) if !value.is_empty() => value.as_str(),
            _ => empty,
        }
    }

    /// Every value for `key`, blank entries replaced by `empty`.
    ///
    /// Falls back to `omni` when `division` does not exist.
    pub fn meta_list(&self, key: &str, division: &str, empty: &str) -> Vec<String> {
        self.lookup(key, division)
            .map(|values| {
                values
                    .iter()
                    .map(|value| {
                        if value.is_empty() {
                            empty.to_string()
                        } else {
                            value.clone()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `division/key` exists, and holds `value` when one is given.
    ///
    /// Unlike `meta`, no `omni` fallback applies.
    pub fn check_meta(&self, key: &str, value: Option<&str>, division: &str) -> bool {
        match self.division(division).and_then(|div| div.values(key)) {
            None => false,
            Some(values) => match value {
                Some(wanted) if !wanted.is_empty() => values.iter().any(|v| v == wanted),
                _ => true,
            },
        }
    }

    /// Removes a key and returns its values.
    pub fn remove_meta(&mut self, key: &str, division: &str) -> Option<Vec<String>> {
        let div = self.divisions.iter_mut().find(|div| div.name == division)?;
        let position = div.entries.iter().position(|(current, _)| current == key)?;
        Some(div.entries.remove(position).1)
    }

    /// Iterates `(division, key, values)`.
    ///
    /// `division = None` walks every division; an unknown division yields
    /// nothing.
    pub fn iter_meta<'a>(
        &'a self,
        division: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a str, &'a [String])> + 'a {
        self.divisions
            .iter()
            .filter(move |div| division.map_or(true, |wanted| div.name == wanted))
            .flat_map(|div| {
                div.entries
                    .iter()
                    .map(move |(key, values)| (div.name.as_str(), key.as_str(), values.as_slice()))
            })
    }

    /// Rebuilds records stored as flat keys `prefix + separator + id`.
    ///
    /// Every value of such a key is one `field + separator + value` pair. A
    /// record carrying a `name` field is keyed by it; other records are
    /// numbered `prefix1`, `prefix2`, ... Records sharing a name merge, the
    /// later fields winning.
    pub fn meta_group(&self, prefix: &str, division: &str, separator: &str) -> Vec<MetaGroup> {
        let Some(div) = self.division(division) else {
            return Vec::new();
        };
        let head = format!("{prefix}{separator}");
        let mut groups: Vec<MetaGroup> = Vec::new();
        let mut counter = 1;
        for (key, values) in &div.entries {
            if !key.starts_with(head.as_str()) {
                continue;
            }
            let mut fields = BTreeMap::new();
            for value in values {
                if let Some((field, rest)) = value.split_once(separator) {
                    fields.insert(field.to_string(), rest.to_string());
                }
            }
            let name = match fields.get("name") {
                Some(name) => name.clone(),
                None => {
                    let generated = format!("{prefix}{counter}");
                    counter += 1;
                    generated
                }
            };
            match groups.iter_mut().find(|group| group.name == name) {
                Some(existing) => existing.fields.extend(fields),
                None => groups.push(MetaGroup { name, fields }),
            }
        }
        groups
    }

    fn lookup(&self, key: &str, division: &str) -> Option<&Vec<String>> {
        let div = self
            .division(division)
            .or_else(|| self.division(DIVISION_OMNI))?;
        div.values(key)
    }

    fn division(&self, name: &str) -> Option<&Division> {
        self.divisions.iter().find(|div| div.name == name)
    }

    fn division_mut_or_insert(&mut self, name: &str) -> &mut Division {
        let position = match self.divisions.iter().position(|div| div.name == name) {
            Some(position) => position,
            None => {
                self.divisions.push(Division {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.divisions.len() - 1
            }
        };
        &mut self.divisions[position]
    }
}
