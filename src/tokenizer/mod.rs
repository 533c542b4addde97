//! The chunked byte-level tokenizer state machine (C4).
//!
//! [`Tokenizer`] consumes successive byte chunks of an XML document and
//! writes packed 32-bit tokens through a [`TokenBuffer`]. All mid-match
//! state - the active [`Cursor`], the element and prefix stacks, the
//! current continuation - lives on the struct itself, so a chunk boundary
//! is never more than a suspended loop: the next `parse` call picks up
//! exactly where the last one left off.

mod charclass;

use patricia_trie::{Cursor, Trie, NOT_FOUND};

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::token::{
    MarkerKind, PartialKind, ProcessingEndType, TokenBuffer, TokenKind, TokenSink, TOKEN_SHIFT,
};
use charclass as cc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagType {
    Element,
    Processing,
    SgmlDeclaration,
}

/// Which family of id-token a name match resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NameKind {
    OpenElement,
    CloseElement,
    Attribute,
    Processing,
    /// The literal `xmlns` default-namespace declaration.
    Xmlns,
}

impl NameKind {
    fn token_kind(self) -> TokenKind {
        match self {
            NameKind::OpenElement => TokenKind::OpenElementId,
            NameKind::CloseElement => TokenKind::CloseElementId,
            NameKind::Attribute => TokenKind::AttributeId,
            NameKind::Processing => TokenKind::ProcessingId,
            NameKind::Xmlns => TokenKind::XmlnsId,
        }
    }

    fn partial_kind(self) -> PartialKind {
        match self {
            NameKind::OpenElement | NameKind::CloseElement | NameKind::Processing => {
                PartialKind::PartialElementId
            }
            NameKind::Attribute | NameKind::Xmlns => PartialKind::PartialAttributeId,
        }
    }

    fn unknown_end(self) -> u32 {
        self.token_kind().unknown_end_for()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Bom,
    BeforeText,
    Text,
    AfterLt,
    BeforeSgml,
    CommentSecondDash,
    Comment,
    CdataLiteral,
    Cdata,
    SgmlDecl,
    SgmlQuoted,
    SgmlText,
    BeforeName,
    MatchTrie,
    Name,
    UnknownName,
    AfterElementName,
    AfterCloseName,
    AfterProcessingName,
    ExpectSelfCloseGt,
    ExpectProcessingGt,
    ExpectEquals,
    ExpectQuote,
    PlainAttributeValue,
    Value,
    XmlnsPrefixName,
    Dead,
}

const CDATA_LITERAL: &[u8] = b"CDATA[";
const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Clone, Copy, Debug)]
struct ElementFrame {
    prefix_stack_offset: usize,
    #[allow(dead_code)] // reserved for future open/close name verification, per source
    crc32: u32,
}

#[derive(Clone, Copy, Debug)]
struct PrefixFrame {
    prefix_id: u32,
    previous_namespace_index: u32,
}

/// The streaming, namespace-aware XML tokenizer.
///
/// Holds a mutable reference to the [`Config`] it resolves names against -
/// mutable because binding a prefix, or unwinding one on element close,
/// mutates `prefix_bindings[i].namespace_index` in place.
pub struct Tokenizer<'cfg, 't> {
    config: &'cfg mut Config<'t>,

    state: State,
    cursor: Cursor<'t>,
    cursor_alive: bool,
    matching_prefix: bool,
    name_kind: NameKind,
    tag_type: TagType,
    end_char: u8,

    /// Bytes successfully advanced through the current cursor match,
    /// carried across chunk boundaries for partial-name recovery (§4.6).
    pos: u32,
    /// Chunk-local offset of the start of the in-progress name/value.
    token_start: usize,
    /// Reused as a small progress counter: BOM bytes matched, `CDATA[`
    /// bytes matched, or trailing `-`/`]` run length for comment/CDATA
    /// terminator detection - these states are mutually exclusive.
    literal_pos: usize,

    defining_xmlns_prefix: bool,
    pending_prefix_id: u32,

    element_prefix: (u32, u32),
    attribute_prefix: (u32, u32),
    current_element_id: u32,

    element_stack: Vec<ElementFrame>,
    prefix_stack: Vec<PrefixFrame>,
    sgml_nesting: u32,

    row: u32,
    col: u32,
    dead: Option<Error>,
}

impl<'cfg, 't> Tokenizer<'cfg, 't> {
    /// Creates a tokenizer over `config`, parked before the BOM check.
    pub fn new(config: &'cfg mut Config<'t>) -> Self {
        let empty_prefix = config.empty_prefix_token();
        Tokenizer {
            config,
            state: State::Bom,
            cursor: Cursor::new(Trie::empty()),
            cursor_alive: false,
            matching_prefix: false,
            name_kind: NameKind::OpenElement,
            tag_type: TagType::Element,
            end_char: b'"',
            pos: 0,
            token_start: 0,
            literal_pos: 0,
            defining_xmlns_prefix: false,
            pending_prefix_id: 0,
            element_prefix: (empty_prefix, 0),
            attribute_prefix: (empty_prefix, 0),
            current_element_id: 0,
            element_stack: Vec::new(),
            prefix_stack: Vec::new(),
            sgml_nesting: 0,
            row: 0,
            col: 0,
            dead: None,
        }
    }

    /// The row the tokenizer is currently positioned at, 0-based.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// The column the tokenizer is currently positioned at, 0-based.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.element_stack.len()
    }

    /// Feeds one chunk of input through the DFA, writing tokens to `out`
    /// and invoking `sink` whenever `out` fills or a new name/URI/prefix is
    /// discovered. Returns `Err` (and poisons the tokenizer for all further
    /// calls) the moment the input is rejected.
    pub fn parse(
        &mut self,
        chunk: &[u8],
        out: &mut TokenBuffer<'_>,
        sink: &mut dyn TokenSink,
    ) -> Result<()> {
        if let Some(e) = self.dead {
            return Err(e);
        }
        match self.run(chunk, out, sink) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.dead = Some(e);
                self.state = State::Dead;
                Err(e)
            }
        }
    }

    #[inline]
    fn track(&mut self, b: u8) {
        // Branchless: blend newline-reset, tab-stop rounding, and a plain
        // +1 advance (suppressed for UTF-8 continuation bytes) by
        // arithmetic rather than branching on byte class.
        let is_nl = (b == b'\n') as u32;
        let is_tab = (b == b'\t') as u32;
        let is_cont = ((b & 0xC0) == 0x80) as u32;
        let advancing = 1 - is_cont;
        let tab_col = (self.col / 8 + 1) * 8;
        let plain_col = self.col + advancing;
        let not_nl = 1 - is_nl;
        self.col = not_nl * (is_tab * tab_col + (1 - is_tab) * plain_col);
        self.row += is_nl;
    }

    fn err(&mut self, kind: ErrorKind) -> Error {
        Error::new(kind, self.row, self.col)
    }

    fn current_prefix_pair(&self) -> (u32, u32) {
        match self.name_kind {
            NameKind::OpenElement | NameKind::CloseElement => self.element_prefix,
            NameKind::Processing => (self.config.processing_prefix_token(), 0),
            NameKind::Attribute | NameKind::Xmlns => self.attribute_prefix,
        }
    }

    fn emit_prefix_id(&mut self, out: &mut TokenBuffer<'_>, sink: &mut dyn TokenSink) {
        let (prefix_id, namespace_index) = self.current_prefix_pair();
        out.write_token(TokenKind::PrefixId, (namespace_index << 14) | prefix_id, sink);
    }

    /// The trie to match an unprefixed name against, or `None` if the
    /// default namespace has no binding at all - distinguished from "bound,
    /// but this name kind's trie happens to be empty" so callers never hand
    /// a cursor an empty trie and then feed it bytes.
    fn default_trie(&self) -> Option<Trie<'t>> {
        let binding = self.config.prefix_binding(self.config.empty_prefix_token());
        binding.namespace().map(|ns| match self.name_kind {
            NameKind::OpenElement | NameKind::CloseElement | NameKind::Processing => {
                ns.element_trie()
            }
            NameKind::Attribute | NameKind::Xmlns => ns.attribute_trie(),
        })
    }

    fn push_element(&mut self) {
        self.element_stack.push(ElementFrame {
            prefix_stack_offset: self.prefix_stack.len(),
            crc32: 0,
        });
    }

    /// Pops the top element, restoring every prefix binding it shadowed.
    /// Returns `false` if the element stack was already empty.
    fn pop_element(&mut self) -> bool {
        let Some(frame) = self.element_stack.pop() else {
            return false;
        };
        while self.prefix_stack.len() > frame.prefix_stack_offset {
            let entry = self.prefix_stack.pop().expect("just checked len");
            self.config
                .restore_prefix_namespace_index(entry.prefix_id, entry.previous_namespace_index);
        }
        true
    }

    /// Partial-name recovery (§4.6): emits either the `(PARTIAL_LEN,
    /// PARTIAL_*_ID, UNKNOWN_START_OFFSET)` triple, when the failed match
    /// straddled a chunk boundary, or a bare `UNKNOWN_START_OFFSET`
    /// otherwise.
    fn emit_partial_or_unknown(
        &mut self,
        i: usize,
        category: PartialKind,
        out: &mut TokenBuffer<'_>,
        sink: &mut dyn TokenSink,
    ) {
        let offset = i as u32;
        let pos = self.pos;
        if pos > 1 && pos > offset {
            out.write_word(PartialKind::PartialLen.pack(pos - 1), sink);
            let id = self.cursor.find_leaf();
            out.write_word(category.pack(id), sink);
            out.write_token(TokenKind::UnknownStartOffset, offset - 1, sink);
        } else {
            out.write_token(TokenKind::UnknownStartOffset, offset - pos, sink);
        }
        self.token_start = i;
        self.pos = 0;
        self.cursor_alive = false;
    }

    /// Completes a successful name match (`cursor.data() != NOT_FOUND`).
    fn finish_name(&mut self, id: u32, out: &mut TokenBuffer<'_>, sink: &mut dyn TokenSink) {
        if !self.matching_prefix && self.name_kind == NameKind::Attribute && id == self.config.xmlns_token() {
            self.emit_prefix_id(out, sink);
            out.write_token(TokenKind::XmlnsId, id, sink);
            self.pending_prefix_id = self.config.empty_prefix_token();
            self.name_kind = NameKind::Xmlns;
            self.state = State::ExpectEquals;
            return;
        }
        match self.name_kind {
            NameKind::OpenElement => {
                self.emit_prefix_id(out, sink);
                out.write_token(TokenKind::OpenElementId, id, sink);
                self.current_element_id = id;
                self.push_element();
                self.state = State::AfterElementName;
            }
            NameKind::CloseElement => {
                self.emit_prefix_id(out, sink);
                out.write_token(TokenKind::CloseElementId, id, sink);
                self.state = State::AfterCloseName;
            }
            NameKind::Attribute => {
                self.emit_prefix_id(out, sink);
                out.write_token(TokenKind::AttributeId, id, sink);
                self.state = State::ExpectEquals;
            }
            NameKind::Processing => {
                out.write_token(TokenKind::ProcessingId, id, sink);
                self.current_element_id = id;
                self.state = State::AfterProcessingName;
            }
            NameKind::Xmlns => unreachable!("xmlns is only reached through the bare-attribute branch above"),
        }
    }

    fn run(
        &mut self,
        chunk: &[u8],
        out: &mut TokenBuffer<'_>,
        sink: &mut dyn TokenSink,
    ) -> Result<()> {
        let mut i = 0usize;
        loop {
            if i >= chunk.len() {
                return Ok(());
            }

            match self.state {
                State::Dead => {
                    return Err(self.dead.expect("Dead state always carries an error"));
                }

                State::Bom => {
                    let c = chunk[i];
                    if self.literal_pos == 0 && c != BOM[0] {
                        self.state = State::BeforeText;
                        continue;
                    }
                    if c != BOM[self.literal_pos] {
                        // A malformed BOM prefix was already consumed; treat the
                        // rest of the document as ordinary text rather than
                        // reconstructing the swallowed bytes as a text token.
                        self.literal_pos = 0;
                        self.state = State::BeforeText;
                        continue;
                    }
                    i += 1;
                    self.literal_pos += 1;
                    if self.literal_pos == BOM.len() {
                        self.literal_pos = 0;
                        self.state = State::BeforeText;
                    }
                }

                State::BeforeText => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c == b'<' {
                        i += 1;
                        self.track(c);
                        self.state = State::AfterLt;
                        continue;
                    }
                    if !cc::is_value_char(c) {
                        return Err(self.err(ErrorKind::InvalidChar));
                    }
                    self.end_char = b'<';
                    out.write_token(TokenKind::TextStartOffset, i as u32, sink);
                    self.token_start = i;
                    self.state = State::Text;
                }

                State::Text => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if c == self.end_char {
                            break;
                        }
                        if !cc::is_value_char(c) {
                            return Err(self.err(ErrorKind::InvalidChar));
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    out.write_token(TokenKind::TextEndOffset, i as u32, sink);
                    i += 1;
                    self.track(b'<');
                    self.state = State::AfterLt;
                }

                State::AfterLt => {
                    let c = chunk[i];
                    if c == b'!' {
                        i += 1;
                        self.track(c);
                        self.tag_type = TagType::SgmlDeclaration;
                        self.state = State::BeforeSgml;
                        continue;
                    }
                    if c == b'?' {
                        i += 1;
                        self.track(c);
                        self.tag_type = TagType::Processing;
                        self.name_kind = NameKind::Processing;
                        self.matching_prefix = false;
                        self.token_start = i;
                        self.pos = 0;
                        let binding = self.config.prefix_binding(self.config.processing_prefix_token());
                        let trie = binding.namespace().map(|ns| ns.element_trie()).unwrap_or_else(Trie::empty);
                        self.cursor.init(trie);
                        self.cursor_alive = true;
                        self.state = State::MatchTrie;
                        continue;
                    }
                    if c == b'/' {
                        i += 1;
                        self.track(c);
                        self.tag_type = TagType::Element;
                        self.name_kind = NameKind::CloseElement;
                        self.state = State::BeforeName;
                        continue;
                    }
                    self.tag_type = TagType::Element;
                    self.name_kind = NameKind::OpenElement;
                    self.state = State::BeforeName;
                }

                State::BeforeSgml => {
                    let c = chunk[i];
                    if c == b'[' {
                        i += 1;
                        self.track(c);
                        self.literal_pos = 0;
                        self.state = State::CdataLiteral;
                        continue;
                    }
                    if c == b'-' {
                        i += 1;
                        self.track(c);
                        self.state = State::CommentSecondDash;
                        continue;
                    }
                    self.sgml_nesting = 0;
                    self.state = State::SgmlDecl;
                }

                State::CommentSecondDash => {
                    let c = chunk[i];
                    if c != b'-' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    i += 1;
                    self.track(c);
                    out.write_token(TokenKind::CommentStartOffset, i as u32, sink);
                    self.token_start = i;
                    self.literal_pos = 0;
                    self.state = State::Comment;
                }

                State::Comment => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        i += 1;
                        self.track(c);
                        if c == b'-' {
                            self.literal_pos = (self.literal_pos + 1).min(2);
                        } else if c == b'>' && self.literal_pos >= 2 {
                            out.write_token(TokenKind::CommentEndOffset, i as u32, sink);
                            self.literal_pos = 0;
                            self.state = State::BeforeText;
                            break;
                        } else {
                            self.literal_pos = 0;
                        }
                    }
                    if self.state == State::Comment && i >= chunk.len() {
                        return Ok(());
                    }
                }

                State::CdataLiteral => {
                    while i < chunk.len() && self.literal_pos < CDATA_LITERAL.len() {
                        let c = chunk[i];
                        if c != CDATA_LITERAL[self.literal_pos] {
                            return Err(self.err(ErrorKind::Other));
                        }
                        self.literal_pos += 1;
                        i += 1;
                        self.track(c);
                    }
                    if self.literal_pos < CDATA_LITERAL.len() {
                        return Ok(());
                    }
                    out.write_token(TokenKind::CdataStartOffset, i as u32, sink);
                    self.token_start = i;
                    self.literal_pos = 0;
                    self.state = State::Cdata;
                }

                State::Cdata => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        i += 1;
                        self.track(c);
                        if c == b']' {
                            self.literal_pos = (self.literal_pos + 1).min(2);
                        } else if c == b'>' && self.literal_pos >= 2 {
                            out.write_token(TokenKind::CdataEndOffset, i as u32, sink);
                            self.literal_pos = 0;
                            self.state = State::BeforeText;
                            break;
                        } else {
                            self.literal_pos = 0;
                        }
                    }
                    if self.state == State::Cdata && i >= chunk.len() {
                        return Ok(());
                    }
                }

                State::SgmlDecl => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if c == b'\'' || c == b'"' {
                            self.end_char = c;
                            i += 1;
                            self.track(c);
                            self.state = State::SgmlQuoted;
                            break;
                        }
                        if c == b'[' {
                            i += 1;
                            self.track(c);
                            self.sgml_nesting += 1;
                            out.write_word(MarkerKind::SgmlNestedStart.pack(0), sink);
                            out.write_token(TokenKind::SgmlTextStartOffset, i as u32, sink);
                            self.token_start = i;
                            self.state = State::SgmlText;
                            break;
                        }
                        if c == b'>' && self.sgml_nesting == 0 {
                            i += 1;
                            self.track(c);
                            out.write_token(TokenKind::SgmlEmitted, 0, sink);
                            self.state = State::BeforeText;
                            break;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if self.state == State::SgmlDecl && i >= chunk.len() {
                        return Ok(());
                    }
                }

                State::SgmlQuoted => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        i += 1;
                        self.track(c);
                        if c == self.end_char {
                            self.state = State::SgmlDecl;
                            break;
                        }
                    }
                    if self.state == State::SgmlQuoted && i >= chunk.len() {
                        return Ok(());
                    }
                }

                State::SgmlText => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if c == b']' {
                            break;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    out.write_token(TokenKind::SgmlTextEndOffset, i as u32, sink);
                    i += 1;
                    self.track(b']');
                    self.sgml_nesting = self.sgml_nesting.saturating_sub(1);
                    out.write_word(MarkerKind::SgmlNestedEnd.pack(0), sink);
                    self.state = State::SgmlDecl;
                }

                State::BeforeName => {
                    let c = chunk[i];
                    if !cc::is_name_start(c) {
                        return Err(self.err(ErrorKind::InvalidChar));
                    }
                    self.token_start = i;
                    self.pos = 0;
                    self.matching_prefix = looks_prefixed(chunk, i);
                    if self.matching_prefix {
                        self.cursor.init(self.config.prefix_trie());
                        self.cursor_alive = true;
                    } else {
                        match self.default_trie() {
                            None => {
                                self.emit_prefix_id(out, sink);
                                self.cursor_alive = false;
                                self.state = State::UnknownName;
                                continue;
                            }
                            Some(trie) => {
                                self.cursor.init(trie);
                                self.cursor_alive = true;
                            }
                        }
                    }
                    self.state = State::MatchTrie;
                }

                State::MatchTrie => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if !cc::is_name_char(c) {
                            break;
                        }
                        if self.cursor_alive {
                            self.cursor_alive = self.cursor.advance(c);
                        }
                        if self.cursor_alive {
                            self.pos += 1;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    self.state = State::Name;
                }

                State::Name => {
                    let c = chunk[i];
                    let found = self.cursor.data();
                    if self.matching_prefix {
                        if c == b':' && self.tag_type == TagType::Element {
                            i += 1;
                            self.track(c);
                            if found != NOT_FOUND
                                && found == self.config.xmlns_prefix_token()
                                && self.name_kind == NameKind::Attribute
                            {
                                self.defining_xmlns_prefix = true;
                                self.pending_prefix_id = 0;
                                self.pos = 0;
                                self.cursor.init(self.config.prefix_trie());
                                self.cursor_alive = true;
                                self.state = State::XmlnsPrefixName;
                                continue;
                            }
                            let binding = if found == NOT_FOUND {
                                None
                            } else {
                                Some(self.config.prefix_binding(found))
                            };
                            let bound_namespace = binding.and_then(|b| b.namespace().map(|ns| (b, ns)));
                            match bound_namespace {
                                None => {
                                    self.emit_prefix_id(out, sink);
                                    out.write_token(TokenKind::UnknownStartOffset, i as u32, sink);
                                    self.token_start = i;
                                    self.pos = 0;
                                    self.cursor_alive = false;
                                    self.state = State::UnknownName;
                                }
                                Some((binding, ns)) => {
                                    let trie = match self.name_kind {
                                        NameKind::OpenElement | NameKind::CloseElement => ns.element_trie(),
                                        _ => ns.attribute_trie(),
                                    };
                                    let pair = (found, binding.namespace_index());
                                    match self.name_kind {
                                        NameKind::OpenElement | NameKind::CloseElement => {
                                            self.element_prefix = pair
                                        }
                                        _ => self.attribute_prefix = pair,
                                    }
                                    self.cursor.init(trie);
                                    self.cursor_alive = true;
                                    self.matching_prefix = false;
                                    self.pos = 0;
                                    self.token_start = i;
                                    self.state = State::MatchTrie;
                                }
                            }
                            continue;
                        }
                        // The chunk-boundary lookahead guessed "possibly
                        // prefixed" but no colon materialized; the prefix-trie
                        // id found (if any) does not name a real entity, so
                        // this run can only be reported as unknown.
                        self.cursor_alive = false;
                        self.emit_partial_or_unknown(i, self.name_kind.partial_kind(), out, sink);
                        self.state = State::UnknownName;
                        continue;
                    }
                    if found != NOT_FOUND {
                        self.finish_name(found, out, sink);
                    } else {
                        self.emit_partial_or_unknown(i, self.name_kind.partial_kind(), out, sink);
                        self.state = State::UnknownName;
                    }
                }

                State::UnknownName => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if !cc::is_name_char(c) {
                            break;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    let c = chunk[i];
                    if c == b':' && self.tag_type == TagType::Element {
                        i += 1;
                        self.track(c);
                        out.write_token(TokenKind::UnknownPrefixEndOffset, i as u32, sink);
                        out.flush(sink);
                        self.token_start = i;
                        out.write_token(TokenKind::UnknownStartOffset, i as u32, sink);
                        self.pos = 0;
                        continue;
                    }
                    let end_kind = self.name_kind.unknown_end();
                    out.write_word(end_kind | ((i as u32) << TOKEN_SHIFT), sink);
                    match self.name_kind {
                        NameKind::OpenElement => {
                            self.push_element();
                            self.state = State::AfterElementName;
                        }
                        NameKind::CloseElement => {
                            if !self.pop_element() {
                                return Err(self.err(ErrorKind::Other));
                            }
                            self.state = State::AfterCloseName;
                        }
                        NameKind::Attribute | NameKind::Xmlns => {
                            self.state = State::ExpectEquals;
                        }
                        NameKind::Processing => {
                            self.state = State::AfterProcessingName;
                        }
                    }
                }

                State::AfterElementName => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c == b'/' {
                        i += 1;
                        self.track(c);
                        self.state = State::ExpectSelfCloseGt;
                        continue;
                    }
                    if c == b'>' {
                        i += 1;
                        self.track(c);
                        out.write_token(TokenKind::ElementEmitted, self.current_element_id, sink);
                        self.state = State::BeforeText;
                        continue;
                    }
                    self.name_kind = NameKind::Attribute;
                    self.matching_prefix = false;
                    self.state = State::BeforeName;
                }

                State::ExpectSelfCloseGt => {
                    let c = chunk[i];
                    i += 1;
                    self.track(c);
                    if c != b'>' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    out.write_token(TokenKind::ClosedElementEmitted, self.current_element_id, sink);
                    if !self.pop_element() {
                        return Err(self.err(ErrorKind::Other));
                    }
                    self.state = State::BeforeText;
                }

                State::AfterCloseName => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c != b'>' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    i += 1;
                    self.track(c);
                    self.state = State::BeforeText;
                }

                State::AfterProcessingName => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c == b'?' {
                        i += 1;
                        self.track(c);
                        self.state = State::ExpectProcessingGt;
                        continue;
                    }
                    if c == b'>' {
                        i += 1;
                        self.track(c);
                        out.write_word(MarkerKind::ProcessingEndType.pack(ProcessingEndType::Sgml as u32), sink);
                        out.write_token(TokenKind::ElementEmitted, self.current_element_id, sink);
                        self.state = State::BeforeText;
                        continue;
                    }
                    self.name_kind = NameKind::Attribute;
                    self.matching_prefix = false;
                    self.state = State::BeforeName;
                }

                State::ExpectProcessingGt => {
                    let c = chunk[i];
                    i += 1;
                    self.track(c);
                    if c != b'>' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    out.write_word(MarkerKind::ProcessingEndType.pack(ProcessingEndType::Xml as u32), sink);
                    out.write_token(TokenKind::ElementEmitted, self.current_element_id, sink);
                    self.state = State::BeforeText;
                }

                State::ExpectEquals => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c != b'=' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    i += 1;
                    self.track(c);
                    self.state = State::ExpectQuote;
                }

                State::ExpectQuote => {
                    let c = chunk[i];
                    if cc::is_white(c) {
                        i += 1;
                        self.track(c);
                        continue;
                    }
                    if c != b'"' && c != b'\'' {
                        return Err(self.err(ErrorKind::Other));
                    }
                    self.end_char = c;
                    i += 1;
                    self.track(c);
                    if self.name_kind == NameKind::Xmlns || self.defining_xmlns_prefix {
                        out.write_token(TokenKind::ValueStartOffset, i as u32, sink);
                        self.token_start = i;
                        self.pos = 0;
                        self.cursor.init(self.config.uri_trie());
                        self.cursor_alive = true;
                        self.state = State::Value;
                    } else {
                        out.write_token(TokenKind::AttributeStartOffset, i as u32, sink);
                        self.token_start = i;
                        self.state = State::PlainAttributeValue;
                    }
                }

                State::PlainAttributeValue => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if c == self.end_char {
                            break;
                        }
                        if !cc::is_value_char(c) {
                            return Err(self.err(ErrorKind::InvalidChar));
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    out.write_token(TokenKind::AttributeEndOffset, i as u32, sink);
                    let terminator = self.end_char;
                    i += 1;
                    self.track(terminator);
                    self.end_char = b'"';
                    self.state = State::AfterElementName;
                }

                State::Value => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if c == self.end_char {
                            break;
                        }
                        if !cc::is_value_char(c) {
                            return Err(self.err(ErrorKind::InvalidChar));
                        }
                        if self.cursor_alive {
                            self.cursor_alive = self.cursor.advance(c);
                        }
                        if self.cursor_alive {
                            self.pos += 1;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    let found = self.cursor.data();
                    if found == NOT_FOUND {
                        self.emit_partial_or_unknown(i, PartialKind::PartialUriId, out, sink);
                        let end_kind = TokenKind::UnknownUriEndOffset as u32;
                        out.write_word(end_kind | ((i as u32) << TOKEN_SHIFT), sink);
                        out.flush(sink);
                    } else {
                        out.write_token(TokenKind::ValueEndOffset, i as u32, sink);
                        let (namespace_index, _ns) = self.config.namespace_for_uri(found);
                        let prefix_id = self.pending_prefix_id;
                        let previous = self.config.prefix_binding(prefix_id).namespace_index();
                        self.config.bind_prefix(prefix_id, found);
                        self.prefix_stack.push(PrefixFrame {
                            prefix_id,
                            previous_namespace_index: previous,
                        });
                        out.write_token(TokenKind::NamespaceId, namespace_index, sink);
                        if prefix_id == self.config.empty_prefix_token() {
                            self.element_prefix = (prefix_id, namespace_index);
                        }
                    }
                    let terminator = self.end_char;
                    i += 1;
                    self.track(terminator);
                    self.end_char = b'"';
                    self.defining_xmlns_prefix = false;
                    self.name_kind = NameKind::Attribute;
                    self.state = State::AfterElementName;
                }

                State::XmlnsPrefixName => {
                    while i < chunk.len() {
                        let c = chunk[i];
                        if !cc::is_name_char(c) {
                            break;
                        }
                        if self.cursor_alive {
                            self.cursor_alive = self.cursor.advance(c);
                        }
                        if self.cursor_alive {
                            self.pos += 1;
                        }
                        i += 1;
                        self.track(c);
                    }
                    if i >= chunk.len() {
                        return Ok(());
                    }
                    let found = self.cursor.data();
                    if found == NOT_FOUND {
                        self.emit_partial_or_unknown(i, PartialKind::PartialPrefixId, out, sink);
                        let end_kind = TokenKind::UnknownPrefixEndOffset as u32;
                        out.write_word(end_kind | ((i as u32) << TOKEN_SHIFT), sink);
                        out.flush(sink);
                        self.pending_prefix_id = 0;
                    } else {
                        if found as usize >= self.config.prefix_table_len() {
                            return Err(self.err(ErrorKind::TooManyPrefixes));
                        }
                        self.pending_prefix_id = found;
                    }
                    self.state = State::ExpectEquals;
                }
            }
        }
    }
}

/// Looks ahead from `i` (not yet consumed) for a `:` before any non-name
/// byte. Treats chunk exhaustion as "possibly a prefix" too, per §4.4.
fn looks_prefixed(chunk: &[u8], mut i: usize) -> bool {
    while i < chunk.len() {
        match chunk[i] {
            b':' => return true,
            c if cc::is_name_char(c) => i += 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;
    use pretty_assertions::assert_eq;

    struct Collect(Vec<u32>);
    impl TokenSink for Collect {
        fn flush(&mut self, tokens: &[u32]) {
            self.0.extend_from_slice(tokens);
        }
    }

    fn run_all(tok: &mut Tokenizer<'_, '_>, input: &[u8]) -> Vec<u32> {
        let mut backing = [0u32; 64];
        let mut sink = Collect(Vec::new());
        {
            let mut buf = TokenBuffer::new(&mut backing);
            tok.parse(input, &mut buf, &mut sink).unwrap();
            buf.flush(&mut sink);
        }
        sink.0
    }

    fn elem_a_trie() -> Trie<'static> {
        #[rustfmt::skip]
        let bytes: &'static [u8] = Box::leak(Box::new([
            8, b'a',
            0x80, 0x00, 0x07,
        ]));
        Trie::from_bytes(bytes)
    }

    /// Binds the default (empty) prefix to a fresh namespace built from the
    /// given element/attribute tries and returns the namespace index.
    fn bind_default_namespace(cfg: &mut Config<'static>, element: Trie<'static>, attribute: Trie<'static>) -> u32 {
        let ns = Namespace::new("", element, attribute);
        let ns_idx = cfg.add_namespace(ns);
        let uri_id = 900;
        assert!(cfg.add_uri(uri_id, ns_idx));
        assert!(cfg.bind_prefix(cfg.empty_prefix_token(), uri_id));
        ns_idx
    }

    #[test]
    fn self_closed_element_with_known_name() {
        let mut cfg = Config::new(1, 2, 3, 4);
        bind_default_namespace(&mut cfg, elem_a_trie(), Trie::empty());

        let mut tok = Tokenizer::new(&mut cfg);
        let tokens = run_all(&mut tok, b"<a/>");

        assert_eq!(tokens[0], TokenKind::OpenElementId.pack(7));
        assert!(tokens.contains(&TokenKind::ClosedElementEmitted.pack(7)));
        assert_eq!(tok.depth(), 0);
    }

    #[test]
    fn unknown_element_reports_unknown_offsets() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let mut tok = Tokenizer::new(&mut cfg);
        let tokens = run_all(&mut tok, b"<xx>");

        let kinds: Vec<u32> = tokens.iter().map(|w| TokenKind::unpack(*w).0).collect();
        assert!(kinds.contains(&(TokenKind::UnknownOpenElementEndOffset as u32)));
    }

    #[test]
    fn comment_range_includes_terminator() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let mut tok = Tokenizer::new(&mut cfg);
        let tokens = run_all(&mut tok, b"<!-- hi -->");

        assert_eq!(tokens[0], TokenKind::CommentStartOffset.pack(4));
        assert_eq!(tokens[1], TokenKind::CommentEndOffset.pack(11));
    }

    #[test]
    fn cdata_range_includes_terminator() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let mut tok = Tokenizer::new(&mut cfg);
        let tokens = run_all(&mut tok, b"<![CDATA[<raw>]]>");

        assert_eq!(TokenKind::unpack(tokens[0]).0, TokenKind::CdataStartOffset as u32);
        assert_eq!(TokenKind::unpack(tokens[1]).0, TokenKind::CdataEndOffset as u32);
    }

    #[test]
    fn chunk_split_name_match_resumes() {
        let mut cfg = Config::new(1, 2, 3, 4);
        #[rustfmt::skip]
        let bytes: &'static [u8] = Box::leak(Box::new([
            64, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h',
            0x80, 0x00, 0x2a,
        ]));
        bind_default_namespace(&mut cfg, Trie::from_bytes(bytes), Trie::empty());

        let mut tok = Tokenizer::new(&mut cfg);
        let mut backing = [0u32; 64];
        let mut sink = Collect(Vec::new());
        {
            let mut buf = TokenBuffer::new(&mut backing);
            tok.parse(b"<abcd", &mut buf, &mut sink).unwrap();
            assert_eq!(buf.count(), 0);
            tok.parse(b"efgh/>", &mut buf, &mut sink).unwrap();
            buf.flush(&mut sink);
        }
        assert!(sink.0.contains(&TokenKind::OpenElementId.pack(42)));
    }

    #[test]
    fn text_between_tags() {
        let mut cfg = Config::new(1, 2, 3, 4);
        let mut tok = Tokenizer::new(&mut cfg);
        let tokens = run_all(&mut tok, b"hello<a>");
        assert_eq!(tokens[0], TokenKind::TextStartOffset.pack(0));
        assert_eq!(tokens[1], TokenKind::TextEndOffset.pack(5));
    }
}
