//! A streaming, namespace-aware XML tokenizer.
//!
//! This crate turns successive byte chunks of an XML document into packed
//! 32-bit tokens, resolving element, attribute, and namespace-URI names
//! against caller-supplied [Patricia tries](patricia_trie) as it goes, with
//! no heap allocation on the hot path and no requirement that a chunk
//! boundary fall anywhere convenient - a [`Tokenizer`] can resume a
//! half-finished name match across any number of `parse` calls.
//!
//! ## Example
//!
//! ```
//! use quick_xml_tokenizer::config::Config;
//! use quick_xml_tokenizer::token::{TokenBuffer, TokenKind};
//! use quick_xml_tokenizer::tokenizer::Tokenizer;
//!
//! let mut config = Config::new(1, 2, 3, 4);
//! let mut tokens = Vec::new();
//! let mut sink = |words: &[u32]| tokens.extend_from_slice(words);
//!
//! let mut tokenizer = Tokenizer::new(&mut config);
//! let mut backing = [0u32; 32];
//! let mut buf = TokenBuffer::new(&mut backing);
//! tokenizer.parse(b"hello", &mut buf, &mut sink).unwrap();
//! buf.flush(&mut sink);
//!
//! assert_eq!(tokens[0], TokenKind::TextStartOffset.pack(0));
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Shared, immutable-after-setup parser configuration.
pub mod config;
/// The tokenizer's error type.
pub mod error;
/// A registered namespace's URI and name tries.
pub mod namespace;
/// Packed token kinds and the output buffer protocol.
pub mod token;
/// The chunked byte-level tokenizer state machine.
pub mod tokenizer;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use namespace::Namespace;
pub use token::{MarkerKind, PartialKind, ProcessingEndType, TokenBuffer, TokenKind, TokenSink};
pub use tokenizer::Tokenizer;

pub use patricia_trie::{Cursor, Trie};
