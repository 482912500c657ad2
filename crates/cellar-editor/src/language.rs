//! Language tables: keywords and delimiter markers per file type.
//!
//! A [`Language`] is static data: the highlighter and the pair pass read it
//! and never change it. Keyword entries ending in `|` are *type* keywords
//! (highlighted as [`Syntax::KeywordSecondary`]); the rest are control
//! keywords ([`Syntax::KeywordPrimary`]).
//!
//! Selection is by file extension or name. The buffer takes whatever table
//! it is given; [`Language::for_path`] is a convenience for callers.
//!
//! Markdown has its own [`Grammar`]: it is highlighted block by block
//! instead of with keywords and comment markers.

use std::path::Path;

use bitflags::bitflags;
use cellar_text::{Cell, Syntax};

bitflags! {
    /// Optional highlighting passes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct HighlightFlags: u8 {
        /// Numeric literals.
        const NUMBERS = 1 << 0;
        /// Quote-delimited strings. Also enables quote pairing.
        const STRINGS = 1 << 1;
    }
}

/// Which highlighter runs over a language's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Grammar {
    /// Keywords, comments, strings, numbers.
    #[default]
    Code,
    /// Markdown blocks and inline spans.
    Markdown,
}

/// Keywords, comment markers, and highlight switches for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub grammar: Grammar,
    pub keywords: &'static [&'static str],
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Characters that open a string. Each must be `"` or `'`.
    pub quotes: &'static [char],
    /// `'ident` with no closing quote is a lifetime or label.
    pub lifetimes: bool,
    pub flags: HighlightFlags,
}

impl Language {
    /// No keywords, no comments, no strings. Brackets still pair.
    pub const PLAIN: Self = Self {
        name: "text",
        extensions: &["txt"],
        grammar: Grammar::Code,
        keywords: &[],
        line_comment: None,
        block_comment: None,
        quotes: &[],
        lifetimes: false,
        flags: HighlightFlags::empty(),
    };

    pub const C: Self = Self {
        name: "c",
        extensions: &["c", "h", "cpp", "hpp", "cc"],
        grammar: Grammar::Code,
        keywords: &[
            "switch", "if", "while", "for", "break", "continue", "return", "else", "struct",
            "union", "typedef", "static", "enum", "class", "case", "default", "goto", "sizeof",
            "const", "#include", "#define", "#ifdef", "#ifndef", "#endif", "int|", "long|",
            "double|", "float|", "char|", "unsigned|", "signed|", "void|", "short|", "bool|",
            "size_t|", "uint8_t|", "uint32_t|", "int64_t|",
        ],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"', '\''],
        lifetimes: false,
        flags: HighlightFlags::NUMBERS.union(HighlightFlags::STRINGS),
    };

    pub const RUST: Self = Self {
        name: "rust",
        extensions: &["rs"],
        grammar: Grammar::Code,
        keywords: &[
            "as", "break", "const", "continue", "crate", "else", "enum", "extern", "fn", "for",
            "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
            "return", "static", "struct", "trait", "type", "unsafe", "use", "where", "while",
            "async", "await", "dyn", "self", "Self|", "bool|", "char|", "str|", "u8|", "u16|",
            "u32|", "u64|", "u128|", "usize|", "i8|", "i16|", "i32|", "i64|", "i128|",
            "isize|", "f32|", "f64|", "String|", "Vec|", "Option|", "Result|", "Box|",
        ],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"', '\''],
        lifetimes: true,
        flags: HighlightFlags::NUMBERS.union(HighlightFlags::STRINGS),
    };

    pub const PYTHON: Self = Self {
        name: "python",
        extensions: &["py", "pyw"],
        grammar: Grammar::Code,
        keywords: &[
            "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else",
            "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
            "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
            "yield", "None|", "True|", "False|", "int|", "float|", "str|", "list|", "dict|",
            "set|", "tuple|", "bytes|",
        ],
        line_comment: Some("#"),
        block_comment: None,
        quotes: &['"', '\''],
        lifetimes: false,
        flags: HighlightFlags::NUMBERS.union(HighlightFlags::STRINGS),
    };

    pub const JAVASCRIPT: Self = Self {
        name: "javascript",
        extensions: &["js", "mjs", "cjs", "ts"],
        grammar: Grammar::Code,
        keywords: &[
            "break", "case", "catch", "class", "const", "continue", "default", "delete", "do",
            "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
            "instanceof", "let", "new", "return", "switch", "this", "throw", "try", "typeof",
            "var", "while", "yield", "async", "await", "true|", "false|", "null|",
            "undefined|", "number|", "string|", "boolean|",
        ],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        quotes: &['"', '\''],
        lifetimes: false,
        flags: HighlightFlags::NUMBERS.union(HighlightFlags::STRINGS),
    };

    /// Headings, emphasis, code, links, lists, quotes, tables. Brackets
    /// still pair.
    pub const MARKDOWN: Self = Self {
        name: "markdown",
        extensions: &["md", "markdown", "mkd", "mdx"],
        grammar: Grammar::Markdown,
        keywords: &[],
        line_comment: None,
        block_comment: None,
        quotes: &[],
        lifetimes: false,
        flags: HighlightFlags::empty(),
    };

    /// Every built-in table, plain text last.
    pub const BUILTIN: &'static [&'static Self] = &[
        &Self::C,
        &Self::RUST,
        &Self::PYTHON,
        &Self::JAVASCRIPT,
        &Self::MARKDOWN,
        &Self::PLAIN,
    ];

    /// Table for `path`'s extension, or `None` for unknown types.
    #[must_use]
    pub fn for_path(path: &Path) -> Option<&'static Self> {
        let ext = path.extension()?.to_str()?;
        Self::BUILTIN
            .iter()
            .copied()
            .find(|lang| lang.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Table by name (`"c"`, `"rust"`, ...).
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        Self::BUILTIN.iter().copied().find(|lang| lang.name == name)
    }

    #[inline]
    #[must_use]
    pub const fn highlights_strings(&self) -> bool {
        self.flags.contains(HighlightFlags::STRINGS)
    }

    #[inline]
    #[must_use]
    pub const fn highlights_numbers(&self) -> bool {
        self.flags.contains(HighlightFlags::NUMBERS)
    }

    /// Cells taken by a lifetime or loop label (`'a`, `'static`) at `at`.
    ///
    /// `'x'` is a character literal, not a lifetime.
    #[must_use]
    pub fn lifetime_at(&self, cells: &[Cell], at: usize) -> Option<usize> {
        if !self.lifetimes || cells.get(at)?.ch != '\'' {
            return None;
        }
        let first = cells.get(at + 1)?.ch;
        if !(first.is_alphabetic() || first == '_') {
            return None;
        }
        if cells.get(at + 2).is_some_and(|c| c.ch == '\'') {
            return None;
        }
        let ident = cells[at + 1..]
            .iter()
            .take_while(|c| c.ch.is_alphanumeric() || c.ch == '_')
            .count();
        Some(1 + ident)
    }

    /// The quote opening a string at `at`, if any.
    #[must_use]
    pub fn quote_at(&self, cells: &[Cell], at: usize) -> Option<char> {
        let ch = cells.get(at)?.ch;
        (self.quotes.contains(&ch) && self.lifetime_at(cells, at).is_none()).then_some(ch)
    }

    /// Longest keyword starting at `at` that ends at a separator or end of
    /// line. Returns its length in cells and its class.
    #[must_use]
    pub fn match_keyword(&self, cells: &[Cell], at: usize) -> Option<(usize, Syntax)> {
        self.keywords
            .iter()
            .filter_map(|entry| {
                let (word, syntax) = entry.strip_suffix('|').map_or(
                    (*entry, Syntax::KeywordPrimary),
                    |w| (w, Syntax::KeywordSecondary),
                );
                let len = matches_at(cells, at, word)?;
                let after = cells.get(at + len).is_none_or(|c| is_separator(c.ch));
                after.then_some((len, syntax))
            })
            .max_by_key(|&(len, _)| len)
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::PLAIN
    }
}

/// Cells consumed if `marker` occurs at `at`.
#[must_use]
pub fn matches_at(cells: &[Cell], at: usize, marker: &str) -> Option<usize> {
    if marker.is_empty() {
        return None;
    }
    let mut len = 0;
    for ch in marker.chars() {
        if cells.get(at + len)?.ch != ch {
            return None;
        }
        len += 1;
    }
    Some(len)
}

/// Token separator for keyword and number boundaries.
#[inline]
#[must_use]
pub fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == '\0' || (ch.is_ascii_punctuation() && ch != '_' && ch != '#')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(s: &str) -> Vec<Cell> {
        s.chars().map(Cell::new).collect()
    }

    #[test]
    fn lookup_by_extension() {
        assert_eq!(Language::for_path(Path::new("main.c")).map(|l| l.name), Some("c"));
        assert_eq!(Language::for_path(Path::new("lib.RS")).map(|l| l.name), Some("rust"));
        assert_eq!(Language::for_path(Path::new("notes.txt")).map(|l| l.name), Some("text"));
        assert_eq!(Language::for_path(Path::new("Makefile")), None);
        assert_eq!(Language::for_path(Path::new("x.unknown")), None);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Language::by_name("python"), Some(&Language::PYTHON));
        assert_eq!(Language::by_name("cobol"), None);
    }

    #[test]
    fn keyword_needs_trailing_separator() {
        let c = cells("int x; integer");
        assert_eq!(
            Language::C.match_keyword(&c, 0),
            Some((3, Syntax::KeywordSecondary))
        );
        assert_eq!(Language::C.match_keyword(&c, 7), None);
    }

    #[test]
    fn keyword_at_end_of_line() {
        let c = cells("return");
        assert_eq!(
            Language::C.match_keyword(&c, 0),
            Some((6, Syntax::KeywordPrimary))
        );
    }

    #[test]
    fn longest_keyword_wins() {
        // "in" and "instanceof" both match the prefix.
        let c = cells("instanceof Foo");
        assert_eq!(
            Language::JAVASCRIPT.match_keyword(&c, 0),
            Some((10, Syntax::KeywordPrimary))
        );
    }

    #[test]
    fn preprocessor_keywords_match() {
        let c = cells("#include <x.h>");
        assert_eq!(
            Language::C.match_keyword(&c, 0),
            Some((8, Syntax::KeywordPrimary))
        );
    }

    #[test]
    fn marker_matching() {
        let c = cells("a/*b");
        assert_eq!(matches_at(&c, 1, "/*"), Some(2));
        assert_eq!(matches_at(&c, 0, "/*"), None);
        assert_eq!(matches_at(&c, 3, "/*"), None);
        assert_eq!(matches_at(&c, 0, ""), None);
    }

    #[test]
    fn markdown_by_extension() {
        let md = Language::for_path(Path::new("README.md"));
        assert_eq!(md.map(|l| l.grammar), Some(Grammar::Markdown));
        assert_eq!(Language::for_path(Path::new("notes.markdown")).map(|l| l.name), Some("markdown"));
        assert_eq!(Language::C.grammar, Grammar::Code);
    }

    #[test]
    fn lifetimes_are_not_quotes() {
        let c = cells("&'a str");
        assert_eq!(Language::RUST.lifetime_at(&c, 1), Some(2));
        assert_eq!(Language::RUST.quote_at(&c, 1), None);
        assert_eq!(Language::C.quote_at(&c, 1), Some('\''));

        let c = cells("'static");
        assert_eq!(Language::RUST.lifetime_at(&c, 0), Some(7));
    }

    #[test]
    fn char_literal_is_a_quote() {
        for text in ["'x'", r"'\n'", "'('"] {
            let c = cells(text);
            assert_eq!(Language::RUST.lifetime_at(&c, 0), None, "{text}");
            assert_eq!(Language::RUST.quote_at(&c, 0), Some('\''), "{text}");
        }
    }

    #[test]
    fn plain_has_no_rules() {
        let plain = Language::default();
        assert!(plain.keywords.is_empty());
        assert!(!plain.highlights_strings());
        assert!(!plain.highlights_numbers());
        assert!(plain.quotes.is_empty());
    }
}
