//! Bidirectional id <-> algorithm tables used at the wire boundary
//!
//! Algorithms themselves are closed enums; the registries only translate the
//! `alg`/`enc` strings found in headers. Built-in tables are populated once and
//! are read-only afterwards.

use crate::error::{JoseError, JoseResult};
use std::collections::HashMap;
use std::hash::Hash;

/// Bidirectional map between wire ids and algorithm values
#[derive(Debug, Clone)]
pub struct Registry<A> {
    by_id: HashMap<String, A>,
    by_alg: HashMap<A, String>,
}

impl<A: Copy + Eq + Hash> Registry<A> {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            by_alg: HashMap::new(),
        }
    }

    /// Bind `id` to `alg`. Fails if either side is already bound.
    pub fn register(&mut self, id: impl Into<String>, alg: A) -> JoseResult<()> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(JoseError::Registry(format!("id {id} is already registered")));
        }
        if let Some(existing) = self.by_alg.get(&alg) {
            return Err(JoseError::Registry(format!(
                "algorithm is already registered as {existing}"
            )));
        }
        self.by_alg.insert(alg, id.clone());
        self.by_id.insert(id, alg);
        Ok(())
    }

    /// Algorithm bound to `id`
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<A> {
        self.by_id.get(id).copied()
    }

    /// Id bound to `alg`
    #[must_use]
    pub fn id_of(&self, alg: A) -> Option<&str> {
        self.by_alg.get(&alg).map(String::as_str)
    }

    /// Number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Registry holding every `(id, alg)` pair, failing on the first conflict
    pub fn from_pairs(pairs: impl IntoIterator<Item = (&'static str, A)>) -> JoseResult<Self> {
        let mut registry = Self::new();
        for (id, alg) in pairs {
            registry.register(id, alg)?;
        }
        Ok(registry)
    }
}

impl<A: Copy + Eq + Hash> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in registry for a closed algorithm enum.
///
/// `ALL` lists every variant with its canonical id; the derived registry is
/// what header parsing consults.
pub trait RegisteredAlgorithm: Copy + Eq + Hash + Send + Sync + 'static {
    /// Family used in error reports
    const FAMILY: crate::error::AlgorithmFamily;

    /// Every built-in variant with its wire id
    const ALL: &'static [(&'static str, Self)];

    /// Process-wide registry for this family
    fn registry() -> &'static Registry<Self>;

    /// Wire id of this algorithm, as bound in [`Self::registry`]
    fn id(self) -> &'static str {
        Self::registry().id_of(self).unwrap_or("")
    }

    /// Resolve a wire id, failing with an unsupported-algorithm error
    fn from_id(id: &str) -> JoseResult<Self> {
        Self::registry()
            .lookup(id)
            .ok_or_else(|| JoseError::unsupported(Self::FAMILY, id))
    }
}

/// Build the static registry for `A` from its `ALL` table.
///
/// The tables are compile-time constants with unique ids, so a conflict here is
/// a programming error; it is logged and the family is left empty.
pub(crate) fn builtin<A: RegisteredAlgorithm>() -> Registry<A> {
    Registry::from_pairs(A::ALL.iter().copied()).unwrap_or_else(|e| {
        tracing::error!("built-in {} registry conflict: {e}", A::FAMILY);
        Registry::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Toy {
        A,
        B,
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::from_pairs([("a", Toy::A), ("b", Toy::B)]).unwrap();
        assert_eq!(registry.lookup("a"), Some(Toy::A));
        assert_eq!(registry.id_of(Toy::B), Some("b"));
        assert_eq!(registry.lookup("c"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = Registry::new();
        registry.register("a", Toy::A).unwrap();
        assert!(matches!(registry.register("a", Toy::B), Err(JoseError::Registry(_))));
        assert_eq!(registry.lookup("a"), Some(Toy::A));
    }

    #[test]
    fn test_duplicate_algorithm_rejected() {
        let mut registry = Registry::new();
        registry.register("a", Toy::A).unwrap();
        assert!(registry.register("alias", Toy::A).is_err());
        assert_eq!(registry.lookup("alias"), None);
    }

    fn assert_builtin_table<A: RegisteredAlgorithm + std::fmt::Debug>() {
        assert_eq!(A::registry().len(), A::ALL.len());
        for &(id, alg) in A::ALL {
            assert_eq!(A::registry().id_of(alg), Some(id));
            assert_eq!(alg.id(), id);
            assert_eq!(A::from_id(id).unwrap(), alg);
        }
    }

    #[test]
    fn test_builtin_tables_resolve_both_ways() {
        assert_builtin_table::<crate::signing::SigningAlgorithm>();
        assert_builtin_table::<crate::content::ContentAlgorithm>();
        assert_builtin_table::<crate::key_codec::KeyAlgorithm>();
    }

    #[test]
    fn test_conflicting_pairs_fail() {
        assert!(matches!(
            Registry::from_pairs([("a", Toy::A), ("a", Toy::B)]),
            Err(JoseError::Registry(_))
        ));
    }
}
