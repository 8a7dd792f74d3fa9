//! Value comparators keyed by attribute `(class, type)`.

use std::collections::HashMap;
use std::fmt::Debug;

use custos_types::tags;
use subtle::ConstantTimeEq;

use crate::{AbacError, Result};

/// Decides whether a provided value satisfies a required one.
pub trait AttributeComparator: Send + Sync {
    fn compare(&self, required: &[u8], provided: &[u8]) -> bool;
}

impl<F> AttributeComparator for F
where
    F: Fn(&[u8], &[u8]) -> bool + Send + Sync,
{
    fn compare(&self, required: &[u8], provided: &[u8]) -> bool {
        self(required, provided)
    }
}

/// Byte equality for pre-shared keys, in constant time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PskComparator;

impl AttributeComparator for PskComparator {
    fn compare(&self, required: &[u8], provided: &[u8]) -> bool {
        required.ct_eq(provided).into()
    }
}

// ============================================================================
// Registry
// ============================================================================

type ComparatorTable = HashMap<String, HashMap<String, Box<dyn AttributeComparator>>>;

/// Closed set of comparators. Built once, immutable afterwards.
pub struct ComparatorRegistry {
    comparators: ComparatorTable,
}

impl ComparatorRegistry {
    pub fn builder() -> ComparatorRegistryBuilder {
        ComparatorRegistryBuilder::default()
    }

    /// Returns true if `(class, attr_type)` can be compared.
    pub fn supports(&self, class: &str, attr_type: &str) -> bool {
        self.lookup(class, attr_type).is_some()
    }

    /// Compares two values under the comparator for `(class, attr_type)`.
    pub fn compare(
        &self,
        class: &str,
        attr_type: &str,
        required: &[u8],
        provided: &[u8],
    ) -> Result<bool> {
        let comparator =
            self.lookup(class, attr_type)
                .ok_or_else(|| AbacError::UnknownComparator {
                    class: class.to_owned(),
                    attr_type: attr_type.to_owned(),
                })?;
        Ok(comparator.compare(required, provided))
    }

    fn lookup(&self, class: &str, attr_type: &str) -> Option<&dyn AttributeComparator> {
        self.comparators
            .get(class)
            .and_then(|types| types.get(attr_type))
            .map(Box::as_ref)
    }
}

impl Default for ComparatorRegistry {
    /// The built-in comparators only: `explicit/psk`.
    fn default() -> Self {
        let mut comparators = ComparatorTable::new();
        comparators
            .entry(tags::CLASS_EXPLICIT.to_owned())
            .or_default()
            .insert(tags::TYPE_PSK.to_owned(), Box::new(PskComparator));
        Self { comparators }
    }
}

impl Debug for ComparatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .comparators
            .iter()
            .flat_map(|(class, types)| types.keys().map(move |t| format!("{class}/{t}")))
            .collect();
        keys.sort();
        f.debug_struct("ComparatorRegistry")
            .field("comparators", &keys)
            .finish()
    }
}

/// Builder for [`ComparatorRegistry`].
///
/// Registering the same `(class, type)` twice is an error reported by
/// [`build`](Self::build).
#[derive(Default)]
pub struct ComparatorRegistryBuilder {
    comparators: ComparatorTable,
    conflicts: Vec<String>,
}

impl ComparatorRegistryBuilder {
    /// Registers the built-in comparators.
    pub fn with_builtins(self) -> Self {
        self.register(tags::CLASS_EXPLICIT, tags::TYPE_PSK, PskComparator)
    }

    pub fn register(
        mut self,
        class: impl Into<String>,
        attr_type: impl Into<String>,
        comparator: impl AttributeComparator + 'static,
    ) -> Self {
        let class = class.into();
        let attr_type = attr_type.into();
        let types = self.comparators.entry(class.clone()).or_default();
        if types.contains_key(&attr_type) {
            self.conflicts
                .push(format!("comparator {class}/{attr_type} registered twice"));
        } else {
            types.insert(attr_type, Box::new(comparator));
        }
        self
    }

    pub fn build(self) -> Result<ComparatorRegistry> {
        if !self.conflicts.is_empty() {
            return Err(AbacError::RegistryConflict(self.conflicts.join("; ")));
        }
        Ok(ComparatorRegistry {
            comparators: self.comparators,
        })
    }
}
