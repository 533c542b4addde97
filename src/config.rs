//! Shared, immutable-after-setup parser configuration (§3 Configuration, §6
//! Configuration surface).

use patricia_trie::{Trie, NOT_FOUND};

use crate::namespace::Namespace;

/// Why a [`Config`] mutation was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The namespace, URI, or prefix index named is out of range.
    IndexOutOfRange,
}

/// A prefix→namespace binding, as tracked in the 256-slot prefix table.
///
/// `namespace_index` is mutated at parse time by `bind_prefix` and by
/// element-stack unwinding (§4.5); `namespace` is a cache that is never
/// invalidated, only ever pointed at a different (already-registered)
/// namespace, since namespace records themselves are immutable once added.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrefixBinding<'t> {
    namespace_index: u32,
    namespace: Option<Namespace<'t>>,
}

impl<'t> PrefixBinding<'t> {
    /// Index into `Config::namespaces`, or `0` (the reserved null entry)
    /// when nothing is bound.
    pub fn namespace_index(&self) -> u32 {
        self.namespace_index
    }

    /// The bound namespace, if any.
    pub fn namespace(&self) -> Option<Namespace<'t>> {
        self.namespace
    }
}

/// Fixed-size prefix-id → namespace table (§3, 256 entries).
const PREFIX_TABLE_LEN: usize = 256;

/// The parser's shared, immutable-after-setup configuration: the namespace
/// catalog, the prefix and URI tries, and the four reserved token ids.
///
/// `Config` is built once by the host before parsing starts, then shared
/// (by reference) across the tokenizer. The one exception to "immutable" is
/// `prefix_bindings[i].namespace_index`, which a running tokenizer mutates
/// through `bind_prefix` and element-stack unwinding (§5) - callers must
/// not share one `Config` across concurrently-running parsers.
pub struct Config<'t> {
    namespaces: Vec<Option<Namespace<'t>>>,
    uri_to_namespace: Vec<u32>,
    prefix_trie: Trie<'t>,
    uri_trie: Trie<'t>,
    prefix_bindings: Vec<PrefixBinding<'t>>,
    xmlns_token: u32,
    empty_prefix_token: u32,
    xmlns_prefix_token: u32,
    processing_prefix_token: u32,
}

impl<'t> Config<'t> {
    /// Creates an empty configuration with the four reserved prefix tokens
    /// bound: the attribute name `xmlns`, the prefix `xmlns` in
    /// `xmlns:foo`, the default-namespace binding slot, and the bucket used
    /// for processing-instruction targets.
    pub fn new(
        xmlns_token: u32,
        empty_prefix_token: u32,
        xmlns_prefix_token: u32,
        processing_prefix_token: u32,
    ) -> Self {
        Config {
            // Index 0 is a reserved sentinel; valid indices start at 1.
            namespaces: vec![None],
            uri_to_namespace: Vec::new(),
            prefix_trie: Trie::empty(),
            uri_trie: Trie::empty(),
            prefix_bindings: vec![PrefixBinding::default(); PREFIX_TABLE_LEN],
            xmlns_token,
            empty_prefix_token,
            xmlns_prefix_token,
            processing_prefix_token,
        }
    }

    /// Registers a namespace and returns its 1-based index.
    pub fn add_namespace(&mut self, ns: Namespace<'t>) -> u32 {
        self.namespaces.push(Some(ns));
        (self.namespaces.len() - 1) as u32
    }

    /// Installs the trie used to recognize namespace prefixes (e.g.
    /// `xmlns`, `xml`, and any user-declared prefixes already known ahead
    /// of time).
    pub fn set_prefix_trie(&mut self, trie: Trie<'t>) {
        self.prefix_trie = trie;
    }

    /// Installs the trie used to recognize namespace URIs.
    pub fn set_uri_trie(&mut self, trie: Trie<'t>) {
        self.uri_trie = trie;
    }

    /// The trie used to recognize namespace prefixes.
    pub fn prefix_trie(&self) -> Trie<'t> {
        self.prefix_trie
    }

    /// The trie used to recognize namespace URIs.
    pub fn uri_trie(&self) -> Trie<'t> {
        self.uri_trie
    }

    /// Records that URI id `uri_id` resolves to the namespace at
    /// `namespace_index`. Returns `false` if `namespace_index` is not a
    /// registered namespace.
    pub fn add_uri(&mut self, uri_id: u32, namespace_index: u32) -> bool {
        if namespace_index == 0 || namespace_index as usize >= self.namespaces.len() {
            return false;
        }
        let uri_id = uri_id as usize;
        if uri_id >= self.uri_to_namespace.len() {
            self.uri_to_namespace.resize(uri_id + 1, 0);
        }
        self.uri_to_namespace[uri_id] = namespace_index;
        true
    }

    /// Resolves a URI id to `(namespace_index, namespace)`, or `(0, None)`
    /// if the URI id is unknown.
    pub fn namespace_for_uri(&self, uri_id: u32) -> (u32, Option<Namespace<'t>>) {
        let namespace_index = self
            .uri_to_namespace
            .get(uri_id as usize)
            .copied()
            .unwrap_or(0);
        (namespace_index, self.namespace_at(namespace_index))
    }

    /// The namespace at `namespace_index`, or `None` for the reserved null
    /// entry or an out-of-range index.
    pub fn namespace_at(&self, namespace_index: u32) -> Option<Namespace<'t>> {
        self.namespaces.get(namespace_index as usize).copied().flatten()
    }

    /// Binds `prefix_id` to whatever namespace `uri_id` currently resolves
    /// to. Returns `false` (and leaves the table untouched) if either index
    /// is out of range.
    pub fn bind_prefix(&mut self, prefix_id: u32, uri_id: u32) -> bool {
        let Some(slot) = self.prefix_bindings.get_mut(prefix_id as usize) else {
            return false;
        };
        if uri_id == NOT_FOUND {
            return false;
        }
        let namespace_index = self
            .uri_to_namespace
            .get(uri_id as usize)
            .copied()
            .unwrap_or(0);
        if namespace_index == 0 {
            return false;
        }
        slot.namespace_index = namespace_index;
        slot.namespace = self.namespaces.get(namespace_index as usize).copied().flatten();
        true
    }

    /// Directly sets `prefix_bindings[prefix_id].namespace_index`, without
    /// touching the cached `&Namespace`. Used to restore a prior binding
    /// when an element that redefined it closes (§4.5); the cache is left
    /// alone since the implementation may reuse it if the same namespace is
    /// rebound later.
    pub fn restore_prefix_namespace_index(&mut self, prefix_id: u32, namespace_index: u32) {
        if let Some(slot) = self.prefix_bindings.get_mut(prefix_id as usize) {
            slot.namespace_index = namespace_index;
        }
    }

    /// The current binding for `prefix_id`, or the default
    /// (`namespace_index = 0`, no namespace) if `prefix_id` is out of
    /// range.
    pub fn prefix_binding(&self, prefix_id: u32) -> PrefixBinding<'t> {
        self.prefix_bindings
            .get(prefix_id as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Number of slots in the prefix binding table (always 256, §3).
    pub fn prefix_table_len(&self) -> usize {
        self.prefix_bindings.len()
    }

    /// The reserved token for the literal attribute name `xmlns`.
    pub fn xmlns_token(&self) -> u32 {
        self.xmlns_token
    }

    /// The reserved token for the prefix `xmlns` in `xmlns:foo`.
    pub fn xmlns_prefix_token(&self) -> u32 {
        self.xmlns_prefix_token
    }

    /// The reserved token for the default-namespace binding slot.
    pub fn empty_prefix_token(&self) -> u32 {
        self.empty_prefix_token
    }

    /// The reserved token bucketing processing-instruction targets.
    pub fn processing_prefix_token(&self) -> u32 {
        self.processing_prefix_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn empty_ns() -> Namespace<'static> {
        Namespace::new("urn:test", Trie::empty(), Trie::empty())
    }

    #[test]
    fn add_namespace_assigns_increasing_indices() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let a = cfg.add_namespace(empty_ns());
        let b = cfg.add_namespace(empty_ns());
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn bind_prefix_round_trips_through_uri() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let ns_idx = cfg.add_namespace(empty_ns());
        assert!(cfg.add_uri(10, ns_idx));
        assert!(cfg.bind_prefix(5, 10));

        let binding = cfg.prefix_binding(5);
        assert_eq!(binding.namespace_index(), ns_idx);
        assert!(binding.namespace().is_some());
    }

    #[test]
    fn bind_prefix_rejects_unknown_uri() {
        let mut cfg = Config::new(1, 2, 3, 4);
        assert!(!cfg.bind_prefix(5, 999));
        assert_eq!(cfg.prefix_binding(5).namespace_index(), 0);
    }

    #[test]
    fn add_uri_rejects_bad_namespace_index() {
        let mut cfg = Config::new(1, 2, 3, 4);
        assert!(!cfg.add_uri(1, 0));
        assert!(!cfg.add_uri(1, 99));
    }

    #[test]
    fn restore_prefix_namespace_index_does_not_clear_cache() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let ns_idx = cfg.add_namespace(empty_ns());
        assert!(cfg.add_uri(10, ns_idx));
        assert!(cfg.bind_prefix(5, 10));

        cfg.restore_prefix_namespace_index(5, 0);
        let binding = cfg.prefix_binding(5);
        assert_eq!(binding.namespace_index(), 0);
        // The cached namespace pointer survives - only the index unwinds.
        assert!(binding.namespace().is_some());
    }

    #[test]
    fn prefix_table_has_256_slots() {
        let cfg = Config::new(1, 2, 3, 4);
        assert_eq!(cfg.prefix_table_len(), 256);
    }
}
