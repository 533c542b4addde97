//! Per-namespace pair of tries.

use patricia_trie::Trie;

/// An XML namespace registered with a [`Config`](crate::config::Config):
/// its URI and the two tries used to resolve element and attribute names
/// once a document has bound a prefix to it.
///
/// Created once, during configuration, and immutable afterwards - it lives
/// as long as the `Config` that owns it.
#[derive(Clone, Copy, Debug)]
pub struct Namespace<'t> {
    uri: &'t str,
    element_trie: Trie<'t>,
    attribute_trie: Trie<'t>,
}

impl<'t> Namespace<'t> {
    /// Registers a namespace with its element and attribute tries.
    pub fn new(uri: &'t str, element_trie: Trie<'t>, attribute_trie: Trie<'t>) -> Self {
        Namespace {
            uri,
            element_trie,
            attribute_trie,
        }
    }

    /// The namespace URI, as registered.
    pub fn uri(&self) -> &'t str {
        self.uri
    }

    /// The trie used to recognize element names qualified by this namespace.
    pub fn element_trie(&self) -> Trie<'t> {
        self.element_trie
    }

    /// The trie used to recognize attribute names qualified by this
    /// namespace.
    pub fn attribute_trie(&self) -> Trie<'t> {
        self.attribute_trie
    }
}
