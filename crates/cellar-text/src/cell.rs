// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of stored text.
//
// Every codepoint in a buffer is one Cell. A cell never holds a whole
// grapheme cluster: a flag or a ZWJ family spans several adjacent cells,
// and every cursor, deletion, and width operation must treat such a run
// as one unit (see `grapheme`).
//
// Next to the codepoint each cell carries three pieces of metadata:
//
//   - a syntax class, written by the highlighter
//   - a neighbor byte: character class and token position, derived from
//     the codepoint and its immediate neighbors
//   - a pair context: the ID, kind, and role of the delimiter pair the
//     cell belongs to, written by the full-buffer pair pass
//
// Keeping the metadata inline means an edit that shifts cells shifts their
// tags with them. There is no side table to fall out of sync.
//
// Size: 12 bytes per cell (char + u32 context + two u8 tags + padding).

use std::fmt;

// ─── Syntax ──────────────────────────────────────────────────────────────────

/// Highlight class assigned by the syntax engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Syntax {
    /// Plain text.
    #[default]
    Normal = 0,
    /// Single-line comment, through end of line.
    Comment = 1,
    /// Inside a block comment, markers included.
    BlockComment = 2,
    /// Control keyword (`if`, `return`, ...).
    KeywordPrimary = 3,
    /// Type keyword (`int`, `u32`, ...).
    KeywordSecondary = 4,
    /// String or character literal, quotes included.
    String = 5,
    /// Numeric literal.
    Number = 6,
    /// Overlay for the current search matches.
    SearchMatch = 7,

    // Markdown.
    /// ATX heading line, `#` markers included.
    Heading = 8,
    /// `*text*` or `_text_`.
    Emphasis = 9,
    /// `**text**` or `__text__`.
    Strong = 10,
    /// `***text***`.
    StrongEmphasis = 11,
    /// Inline code span, backticks included.
    CodeSpan = 12,
    /// Fenced or indented code block, fences included.
    CodeBlock = 13,
    /// `[text]` of a link or image.
    LinkText = 14,
    /// `(url)` of a link or image.
    LinkUrl = 15,
    /// The `!` of an image.
    Image = 16,
    /// Blockquote marker.
    BlockQuote = 17,
    /// `-`, `*`, `+`, or `1.` list marker.
    ListMarker = 18,
    /// `[ ]` or `[x]` after a list marker.
    TaskMarker = 19,
    /// Thematic break line.
    Rule = 20,
    /// Backslash escape and the character it escapes.
    Escape = 21,
    /// Table pipes and separator rows.
    Table = 22,
}

impl Syntax {
    /// Whether this class is either comment flavor.
    #[inline]
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(self, Self::Comment | Self::BlockComment)
    }

    /// Whether this class is only produced by the markdown highlighter.
    #[inline]
    #[must_use]
    pub const fn is_markdown(self) -> bool {
        self as u8 >= Self::Heading as u8
    }
}

// ─── Character Class ─────────────────────────────────────────────────────────

/// Word-boundary class of a codepoint. Fits in 3 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum CharClass {
    /// Space, tab, and other Unicode whitespace.
    #[default]
    Whitespace = 0,
    /// Alphabetic in any script.
    Letter = 1,
    /// Numeric.
    Digit = 2,
    /// `_`.
    Underscore = 3,
    /// ASCII punctuation that is not a bracket or quote.
    Punctuation = 4,
    /// `(` `)` `[` `]` `{` `}`.
    Bracket = 5,
    /// `"` `'` `` ` ``.
    Quote = 6,
    /// Everything else: symbols, emoji, controls, combining marks.
    Other = 7,
}

impl CharClass {
    /// Classify a codepoint.
    #[must_use]
    pub fn of(ch: char) -> Self {
        match ch {
            '_' => Self::Underscore,
            '(' | ')' | '[' | ']' | '{' | '}' => Self::Bracket,
            '"' | '\'' | '`' => Self::Quote,
            c if c.is_ascii_punctuation() => Self::Punctuation,
            c if c.is_whitespace() => Self::Whitespace,
            c if c.is_alphabetic() => Self::Letter,
            c if c.is_numeric() => Self::Digit,
            _ => Self::Other,
        }
    }

    /// Letters, digits, and underscore join into words. Nothing else does.
    #[inline]
    #[must_use]
    pub const fn is_word(self) -> bool {
        matches!(self, Self::Letter | Self::Digit | Self::Underscore)
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Whitespace,
            1 => Self::Letter,
            2 => Self::Digit,
            3 => Self::Underscore,
            4 => Self::Punctuation,
            5 => Self::Bracket,
            6 => Self::Quote,
            _ => Self::Other,
        }
    }
}

// ─── Token Position ──────────────────────────────────────────────────────────

/// Where a cell sits inside its word. Fits in 2 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum TokenPosition {
    /// No word-forming neighbor on either side.
    #[default]
    Solo = 0,
    /// Word continues to the right only.
    Start = 1,
    /// Word continues on both sides.
    Middle = 2,
    /// Word continues to the left only.
    End = 3,
}

impl TokenPosition {
    /// Position from whether the cell joins its left and right neighbors.
    #[inline]
    #[must_use]
    pub const fn from_joins(joins_left: bool, joins_right: bool) -> Self {
        match (joins_left, joins_right) {
            (false, false) => Self::Solo,
            (false, true) => Self::Start,
            (true, true) => Self::Middle,
            (true, false) => Self::End,
        }
    }

    /// First cell of a token (solo cells are their own start).
    #[inline]
    #[must_use]
    pub const fn begins_token(self) -> bool {
        matches!(self, Self::Solo | Self::Start)
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Solo,
            1 => Self::Start,
            2 => Self::Middle,
            _ => Self::End,
        }
    }
}

// ─── Neighbor Byte ───────────────────────────────────────────────────────────

/// Character class in bits 0-2, token position in bits 3-4.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Neighbor(u8);

impl Neighbor {
    const CLASS_MASK: u8 = 0x07;
    const POSITION_MASK: u8 = 0x18;
    const POSITION_SHIFT: u32 = 3;

    #[inline]
    #[must_use]
    pub const fn new(class: CharClass, position: TokenPosition) -> Self {
        Self((class as u8 & Self::CLASS_MASK) | ((position as u8) << Self::POSITION_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn class(self) -> CharClass {
        CharClass::from_bits(self.0 & Self::CLASS_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn position(self) -> TokenPosition {
        TokenPosition::from_bits((self.0 & Self::POSITION_MASK) >> Self::POSITION_SHIFT)
    }

    /// The raw packed byte.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Neighbor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Neighbor({:?}, {:?})", self.class(), self.position())
    }
}

// ─── Pair Context ────────────────────────────────────────────────────────────

/// Kind of delimiter pair. Fits in 3 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum PairKind {
    #[default]
    None = 0,
    /// Block comment markers.
    Comment = 1,
    Paren = 2,
    Bracket = 3,
    Brace = 4,
    DoubleQuote = 5,
    SingleQuote = 6,
}

impl PairKind {
    /// Opening or closing bracket character for this kind.
    #[must_use]
    pub const fn of_bracket(ch: char) -> Option<(Self, PairRole)> {
        match ch {
            '(' => Some((Self::Paren, PairRole::Opener)),
            ')' => Some((Self::Paren, PairRole::Closer)),
            '[' => Some((Self::Bracket, PairRole::Opener)),
            ']' => Some((Self::Bracket, PairRole::Closer)),
            '{' => Some((Self::Brace, PairRole::Opener)),
            '}' => Some((Self::Brace, PairRole::Closer)),
            _ => None,
        }
    }

    /// Quote kind for a quote character.
    #[must_use]
    pub const fn of_quote(ch: char) -> Option<Self> {
        match ch {
            '"' => Some(Self::DoubleQuote),
            '\'' => Some(Self::SingleQuote),
            _ => None,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        match bits & 0x07 {
            1 => Self::Comment,
            2 => Self::Paren,
            3 => Self::Bracket,
            4 => Self::Brace,
            5 => Self::DoubleQuote,
            6 => Self::SingleQuote,
            _ => Self::None,
        }
    }
}

/// Which end of a pair a cell is. Fits in 2 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum PairRole {
    #[default]
    None = 0,
    Opener = 1,
    Closer = 2,
}

impl PairRole {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0x03 {
            1 => Self::Opener,
            2 => Self::Closer,
            _ => Self::None,
        }
    }
}

/// Pair ID in bits 0-23, kind in bits 24-26, role in bits 27-28.
///
/// Two cells are entangled when they carry the same nonzero ID with
/// opposite roles. ID 0 means "no pair".
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PairContext(u32);

impl PairContext {
    /// Unpaired cell.
    pub const NONE: Self = Self(0);

    /// Largest representable pair ID.
    pub const MAX_ID: u32 = 0x00FF_FFFF;

    const ID_MASK: u32 = 0x00FF_FFFF;
    const KIND_MASK: u32 = 0x0700_0000;
    const KIND_SHIFT: u32 = 24;
    const ROLE_MASK: u32 = 0x1800_0000;
    const ROLE_SHIFT: u32 = 27;

    /// Pack a context. IDs wider than 24 bits are truncated.
    #[inline]
    #[must_use]
    pub const fn new(id: u32, kind: PairKind, role: PairRole) -> Self {
        Self(
            (id & Self::ID_MASK)
                | (((kind as u32) << Self::KIND_SHIFT) & Self::KIND_MASK)
                | (((role as u32) << Self::ROLE_SHIFT) & Self::ROLE_MASK),
        )
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0 & Self::ID_MASK
    }

    #[inline]
    #[must_use]
    pub const fn kind(self) -> PairKind {
        PairKind::from_bits((self.0 & Self::KIND_MASK) >> Self::KIND_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn role(self) -> PairRole {
        PairRole::from_bits((self.0 & Self::ROLE_MASK) >> Self::ROLE_SHIFT)
    }

    /// Whether the cell takes part in any pair.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The raw packed word.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PairContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "PairContext(none)")
        } else {
            write!(
                f,
                "PairContext(#{} {:?} {:?})",
                self.id(),
                self.kind(),
                self.role()
            )
        }
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// One codepoint plus its inline metadata.
///
/// # Layout (12 bytes)
///
/// ```text
/// ┌──────────┬──────────────┬────────┬──────────┬─────────┐
/// │ ch: char │ context: u32 │ syntax │ neighbor │ padding │
/// │ 4 bytes  │   4 bytes    │   u8   │    u8    │ 2 bytes │
/// └──────────┴──────────────┴────────┴──────────┴─────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// The codepoint. Malformed input decodes to U+FFFD.
    pub ch: char,

    /// Highlight class.
    pub syntax: Syntax,

    /// Character class and token position.
    pub neighbor: Neighbor,

    /// Delimiter pair linkage.
    pub context: PairContext,
}

impl Cell {
    /// A cell with no syntax or pair tags. The neighbor byte holds the
    /// codepoint's own class as a solo token until the line's neighbors are
    /// computed.
    #[inline]
    #[must_use]
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            syntax: Syntax::Normal,
            neighbor: Neighbor::new(CharClass::of(ch), TokenPosition::Solo),
            context: PairContext::NONE,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_syntax(self, syntax: Syntax) -> Self {
        Self { syntax, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_context(self, context: PairContext) -> Self {
        Self { context, ..self }
    }

    /// Character class from the neighbor byte.
    #[inline]
    #[must_use]
    pub const fn class(self) -> CharClass {
        self.neighbor.class()
    }

    /// Whether the cell is blank (space or tab class).
    #[inline]
    #[must_use]
    pub const fn is_whitespace(self) -> bool {
        matches!(self.neighbor.class(), CharClass::Whitespace)
    }

    /// Clear syntax and pair metadata, keeping the codepoint and neighbor byte.
    #[inline]
    pub const fn clear_tags(&mut self) {
        self.syntax = Syntax::Normal;
        self.context = PairContext::NONE;
    }
}

impl From<char> for Cell {
    #[inline]
    fn from(ch: char) -> Self {
        Self::new(ch)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({:?}", self.ch)?;
        if self.syntax != Syntax::Normal {
            write!(f, ", {:?}", self.syntax)?;
        }
        if !self.context.is_none() {
            write!(f, ", {:?}", self.context)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
