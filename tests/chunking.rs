//! Feeds the same document through the tokenizer split at every possible
//! byte offset and checks the token stream matches a single-chunk run,
//! directly exercising the resumability property the tokenizer promises.

use pretty_assertions::assert_eq;

use quick_xml_tokenizer::config::Config;
use quick_xml_tokenizer::namespace::Namespace;
use quick_xml_tokenizer::token::{TokenBuffer, TokenSink};
use quick_xml_tokenizer::tokenizer::Tokenizer;
use quick_xml_tokenizer::Trie;

struct Collect(Vec<u32>);

impl TokenSink for Collect {
    fn flush(&mut self, tokens: &[u32]) {
        self.0.extend_from_slice(tokens);
    }
}

/// A trie with the single key "book" -> id 7, flat (no siblings).
fn book_trie() -> Trie<'static> {
    #[rustfmt::skip]
    let bytes: &'static [u8] = &[
        32, b'b', b'o', b'o', b'k',
        0x80, 0x00, 0x07,
    ];
    Trie::from_bytes(bytes)
}

fn config_with_default_element(trie: Trie<'static>) -> Config<'static> {
    let mut cfg = Config::new(1, 2, 3, 4);
    let ns = Namespace::new("", trie, Trie::empty());
    let ns_idx = cfg.add_namespace(ns);
    assert!(cfg.add_uri(500, ns_idx));
    assert!(cfg.bind_prefix(cfg.empty_prefix_token(), 500));
    cfg
}

fn run_in_one_chunk(cfg: &mut Config<'static>, input: &[u8]) -> Vec<u32> {
    let mut tok = Tokenizer::new(cfg);
    let mut backing = [0u32; 256];
    let mut sink = Collect(Vec::new());
    {
        let mut buf = TokenBuffer::new(&mut backing);
        tok.parse(input, &mut buf, &mut sink).unwrap();
        buf.flush(&mut sink);
    }
    sink.0
}

fn run_split_at(cfg: &mut Config<'static>, input: &[u8], offset: usize) -> Vec<u32> {
    let mut tok = Tokenizer::new(cfg);
    let mut backing = [0u32; 256];
    let mut sink = Collect(Vec::new());
    {
        let mut buf = TokenBuffer::new(&mut backing);
        tok.parse(&input[..offset], &mut buf, &mut sink).unwrap();
        tok.parse(&input[offset..], &mut buf, &mut sink).unwrap();
        buf.flush(&mut sink);
    }
    sink.0
}

#[test]
fn splitting_self_closed_element_at_every_offset_is_a_no_op() {
    let input = b"<book/>";

    let mut baseline_cfg = config_with_default_element(book_trie());
    let baseline = run_in_one_chunk(&mut baseline_cfg, input);
    assert!(!baseline.is_empty());

    for offset in 0..=input.len() {
        let mut cfg = config_with_default_element(book_trie());
        let split = run_split_at(&mut cfg, input, offset);
        assert_eq!(split, baseline, "mismatch when splitting at offset {offset}");
    }
}

#[test]
fn splitting_text_run_at_every_offset_is_a_no_op() {
    let input = b"hello world<a/>";

    let mut baseline_cfg = Config::new(1, 2, 3, 4);
    let baseline = run_in_one_chunk(&mut baseline_cfg, input);
    assert!(!baseline.is_empty());

    for offset in 0..=input.len() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let split = run_split_at(&mut cfg, input, offset);
        assert_eq!(split, baseline, "mismatch when splitting at offset {offset}");
    }
}

#[test]
fn splitting_comment_at_every_offset_is_a_no_op() {
    let input = b"<!-- a comment -->";

    let mut baseline_cfg = Config::new(1, 2, 3, 4);
    let baseline = run_in_one_chunk(&mut baseline_cfg, input);
    assert!(!baseline.is_empty());

    for offset in 0..=input.len() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let split = run_split_at(&mut cfg, input, offset);
        assert_eq!(split, baseline, "mismatch when splitting at offset {offset}");
    }
}
