//! Incremental matcher for a compact, pre-built [Patricia trie] wire format.
//!
//! # Features
//!
//! `patricia-trie` supports the following features:
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!(
        feature_label = "<a id=\"{feature}\" href=\"#{feature}\"><strong><code>{feature}</code></strong></a>"
    ))
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docs_rs, feature(doc_auto_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]
//!
//! [Patricia trie]: https://en.wikipedia.org/wiki/Radix_tree
//!
//! This crate does not build tries - it only walks them. A trie is built by
//! some other tool ahead of time and handed to this crate as a borrowed byte
//! slice; see [`Trie::from_bytes`] for the wire format.

mod cursor;

pub use cursor::{Cursor, Trie, ID_MASK, NOT_FOUND};
