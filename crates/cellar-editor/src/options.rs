//! Buffer options and the words of a `:set` command.
//!
//! Every word resolves to an [`OptionName`] while it is parsed, so a
//! [`Setting`] is always valid for the option it names and applying it
//! cannot fail. [`Options::apply_str`] parses the whole argument string
//! before touching anything: one bad word leaves every option as it was.
//!
//! Words: `name` turns a flag on (or shows a count), `noname` turns it off,
//! `name!` toggles it, `name?` shows it, `name=N` sets a count, `all` shows
//! everything, and an empty string shows what differs from the defaults.
//!
//! | Option       | Short | Holds                        |
//! |--------------|-------|------------------------------|
//! | `tabstop`    | `ts`  | columns per tab, at least 1  |
//! | `undowindow` | `uw`  | undo coalescing window in ms |
//! | `wrapscan`   | `ws`  | flag                         |
//! | `ignorecase` | `ic`  | flag                         |
//! | `hlstrings`  | `hls` | flag, overrides the language |
//! | `hlnumbers`  | `hln` | flag, overrides the language |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::language::HighlightFlags;

/// Why a `:set` word was rejected. Carries the word as typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),

    #[error("not a boolean option: {0}")]
    NotBoolean(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// An option known to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionName {
    TabStop,
    UndoWindow,
    WrapScan,
    IgnoreCase,
    HighlightStrings,
    HighlightNumbers,
}

impl OptionName {
    /// Listing order.
    pub const ALL: [Self; 6] = [
        Self::TabStop,
        Self::UndoWindow,
        Self::WrapScan,
        Self::IgnoreCase,
        Self::HighlightStrings,
        Self::HighlightNumbers,
    ];

    /// The full and short spelling.
    #[must_use]
    pub const fn spellings(self) -> (&'static str, &'static str) {
        match self {
            Self::TabStop => ("tabstop", "ts"),
            Self::UndoWindow => ("undowindow", "uw"),
            Self::WrapScan => ("wrapscan", "ws"),
            Self::IgnoreCase => ("ignorecase", "ic"),
            Self::HighlightStrings => ("hlstrings", "hls"),
            Self::HighlightNumbers => ("hlnumbers", "hln"),
        }
    }

    /// Flags are on or off; the rest hold a count.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        !matches!(self, Self::TabStop | Self::UndoWindow)
    }

    /// The option spelled `word`, in full or short form.
    #[must_use]
    pub fn lookup(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| {
            let (full, short) = name.spellings();
            word == full || word == short
        })
    }

    const fn accepts(self, count: u64) -> bool {
        !matches!(self, Self::TabStop) || count > 0
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spellings().0)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// What a flag word does to its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    On,
    Off,
    Toggle,
}

/// One parsed `:set` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Flag(OptionName, Flip),
    Count(OptionName, u64),
    Show(OptionName),
    ShowChanged,
    ShowAll,
}

impl Setting {
    /// Parse one word.
    ///
    /// # Errors
    ///
    /// Unknown names, flag operations on counts, counts given to flags,
    /// and counts an option does not accept.
    pub fn parse(word: &str) -> Result<Self, OptionError> {
        let unknown = |name: &str| OptionError::Unknown(name.to_string());
        let resolve = |name: &str| OptionName::lookup(name).ok_or_else(|| unknown(name));

        if word == "all" {
            return Ok(Self::ShowAll);
        }
        if let Some((name, value)) = word.split_once('=') {
            let option = resolve(name)?;
            let invalid = || OptionError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
            };
            let count: u64 = value.parse().map_err(|_| invalid())?;
            if option.is_flag() || !option.accepts(count) {
                return Err(invalid());
            }
            return Ok(Self::Count(option, count));
        }
        if let Some(name) = word.strip_suffix('?') {
            return resolve(name).map(Self::Show);
        }
        if let Some(name) = word.strip_suffix('!') {
            let option = resolve(name)?;
            if !option.is_flag() {
                return Err(OptionError::NotBoolean(name.to_string()));
            }
            return Ok(Self::Flag(option, Flip::Toggle));
        }
        if let Some(option) = OptionName::lookup(word) {
            return Ok(if option.is_flag() {
                Self::Flag(option, Flip::On)
            } else {
                Self::Show(option)
            });
        }
        match word.strip_prefix("no").and_then(OptionName::lookup) {
            Some(option) if option.is_flag() => Ok(Self::Flag(option, Flip::Off)),
            Some(_) => Err(OptionError::NotBoolean(word.to_string())),
            None => Err(unknown(word)),
        }
    }

    /// Parse a whole argument string. Empty means [`Setting::ShowChanged`].
    ///
    /// # Errors
    ///
    /// The first word that does not parse.
    pub fn parse_all(args: &str) -> Result<Vec<Self>, OptionError> {
        if args.trim().is_empty() {
            return Ok(vec![Self::ShowChanged]);
        }
        args.split_whitespace().map(Self::parse).collect()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-buffer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Columns per tab stop. Never zero.
    pub tabstop: usize,
    /// Undo coalescing window.
    pub undo_window: Duration,
    /// Searches wrap around the ends of the buffer.
    pub wrapscan: bool,
    /// Searches ignore case.
    pub ignorecase: bool,
    /// Override for the language's string highlighting; `None` keeps it.
    pub highlight_strings: Option<bool>,
    /// Override for the language's number highlighting; `None` keeps it.
    pub highlight_numbers: Option<bool>,
}

impl Options {
    pub const DEFAULT_TABSTOP: usize = 4;

    /// Apply one setting. Shows return the text to display.
    pub fn apply(&mut self, setting: Setting) -> Option<String> {
        match setting {
            Setting::Flag(name, flip) => {
                let current = self.flag(name).unwrap_or(false);
                let value = match flip {
                    Flip::On => true,
                    Flip::Off => false,
                    Flip::Toggle => !current,
                };
                self.set_flag(name, value);
                None
            }
            Setting::Count(name, count) => {
                self.set_count(name, count);
                None
            }
            Setting::Show(name) => Some(self.show(name)),
            Setting::ShowChanged => Some(self.listing(true)),
            Setting::ShowAll => Some(self.listing(false)),
        }
    }

    /// Parse and apply a whole `:set` argument string. Nothing changes
    /// unless every word parses. Returns the text of any shows.
    ///
    /// # Errors
    ///
    /// The first word that does not parse.
    pub fn apply_str(&mut self, args: &str) -> Result<Vec<String>, OptionError> {
        let settings = Setting::parse_all(args)?;
        Ok(settings.into_iter().filter_map(|s| self.apply(s)).collect())
    }

    /// `name` and its value as `:set` prints it.
    #[must_use]
    pub fn show(&self, name: OptionName) -> String {
        match (self.flag(name), self.count(name)) {
            (Some(true), _) => name.to_string(),
            (Some(false), _) => format!("no{name}"),
            (None, count) => format!("{name}={}", count.unwrap_or_default()),
        }
    }

    /// Effective highlight switches given the language's own.
    #[must_use]
    pub fn highlight_flags(&self, base: HighlightFlags) -> HighlightFlags {
        let mut flags = base;
        if let Some(on) = self.highlight_strings {
            flags.set(HighlightFlags::STRINGS, on);
        }
        if let Some(on) = self.highlight_numbers {
            flags.set(HighlightFlags::NUMBERS, on);
        }
        flags
    }

    const fn flag(&self, name: OptionName) -> Option<bool> {
        match name {
            OptionName::WrapScan => Some(self.wrapscan),
            OptionName::IgnoreCase => Some(self.ignorecase),
            OptionName::HighlightStrings => Some(matches!(self.highlight_strings, None | Some(true))),
            OptionName::HighlightNumbers => Some(matches!(self.highlight_numbers, None | Some(true))),
            OptionName::TabStop | OptionName::UndoWindow => None,
        }
    }

    fn count(&self, name: OptionName) -> Option<u64> {
        match name {
            OptionName::TabStop => u64::try_from(self.tabstop).ok(),
            OptionName::UndoWindow => u64::try_from(self.undo_window.as_millis()).ok(),
            _ => None,
        }
    }

    const fn set_flag(&mut self, name: OptionName, value: bool) {
        match name {
            OptionName::WrapScan => self.wrapscan = value,
            OptionName::IgnoreCase => self.ignorecase = value,
            OptionName::HighlightStrings => self.highlight_strings = Some(value),
            OptionName::HighlightNumbers => self.highlight_numbers = Some(value),
            OptionName::TabStop | OptionName::UndoWindow => {}
        }
    }

    fn set_count(&mut self, name: OptionName, count: u64) {
        match name {
            OptionName::TabStop => {
                self.tabstop = usize::try_from(count).unwrap_or(usize::MAX).max(1);
            }
            OptionName::UndoWindow => self.undo_window = Duration::from_millis(count),
            _ => {}
        }
    }

    fn listing(&self, changed_only: bool) -> String {
        let defaults = Self::default();
        OptionName::ALL
            .into_iter()
            .map(|name| (self.show(name), defaults.show(name)))
            .filter(|(now, default)| !changed_only || now != default)
            .map(|(now, _)| now)
            .collect::<Vec<_>>()
            .join("  ")
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tabstop: Self::DEFAULT_TABSTOP,
            undo_window: Duration::from_secs(1),
            wrapscan: true,
            ignorecase: false,
            highlight_strings: None,
            highlight_numbers: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(word: &str) -> Setting {
        Setting::parse(word).unwrap()
    }

    // ── Setting::parse ────────────────────────────────────────────────────

    #[test]
    fn flag_words() {
        assert_eq!(parse("wrapscan"), Setting::Flag(OptionName::WrapScan, Flip::On));
        assert_eq!(parse("nows"), Setting::Flag(OptionName::WrapScan, Flip::Off));
        assert_eq!(parse("ic!"), Setting::Flag(OptionName::IgnoreCase, Flip::Toggle));
        assert_eq!(parse("nohln"), Setting::Flag(OptionName::HighlightNumbers, Flip::Off));
    }

    #[test]
    fn count_words() {
        assert_eq!(parse("ts=8"), Setting::Count(OptionName::TabStop, 8));
        assert_eq!(parse("undowindow=250"), Setting::Count(OptionName::UndoWindow, 250));
        assert_eq!(parse("tabstop"), Setting::Show(OptionName::TabStop));
        assert_eq!(parse("ic?"), Setting::Show(OptionName::IgnoreCase));
    }

    #[test]
    fn empty_and_all() {
        assert_eq!(Setting::parse_all("  "), Ok(vec![Setting::ShowChanged]));
        assert_eq!(Setting::parse_all("all"), Ok(vec![Setting::ShowAll]));
        assert_eq!(Setting::parse_all("ts=2 ic").map(|s| s.len()), Ok(2));
    }

    #[test]
    fn rejected_words_keep_their_spelling() {
        assert_eq!(Setting::parse("nonsense"), Err(OptionError::Unknown("nonsense".into())));
        assert_eq!(Setting::parse("ts!"), Err(OptionError::NotBoolean("ts".into())));
        assert_eq!(Setting::parse("nots"), Err(OptionError::NotBoolean("nots".into())));
        assert_eq!(Setting::parse("x?"), Err(OptionError::Unknown("x".into())));
        assert_eq!(
            Setting::parse("ts=0"),
            Err(OptionError::InvalidValue { name: "ts".into(), value: "0".into() })
        );
        assert_eq!(
            Setting::parse("ws=1"),
            Err(OptionError::InvalidValue { name: "ws".into(), value: "1".into() })
        );
        assert_eq!(
            Setting::parse("uw=-5"),
            Err(OptionError::InvalidValue { name: "uw".into(), value: "-5".into() })
        );
    }

    #[test]
    fn every_option_has_two_spellings() {
        for name in OptionName::ALL {
            let (full, short) = name.spellings();
            assert_eq!(OptionName::lookup(full), Some(name));
            assert_eq!(OptionName::lookup(short), Some(name));
        }
    }

    // ── Options::apply ───────────────────────────────────────────────────

    #[test]
    fn apply_counts() {
        let mut o = Options::default();
        o.apply_str("ts=8 uw=250").unwrap();
        assert_eq!(o.tabstop, 8);
        assert_eq!(o.undo_window, Duration::from_millis(250));
    }

    #[test]
    fn apply_flags() {
        let mut o = Options::default();
        o.apply_str("nows ic").unwrap();
        assert!(!o.wrapscan);
        assert!(o.ignorecase);
        o.apply_str("ic!").unwrap();
        assert!(!o.ignorecase);
    }

    #[test]
    fn shows_return_text() {
        let mut o = Options::default();
        assert_eq!(o.apply_str("ts? ws?").unwrap(), vec!["tabstop=4", "wrapscan"]);
        assert_eq!(o.apply_str("uw").unwrap(), vec!["undowindow=1000"]);
        o.apply_str("nohls").unwrap();
        assert_eq!(o.show(OptionName::HighlightStrings), "nohlstrings");
    }

    #[test]
    fn show_changed_lists_only_changes() {
        let mut o = Options::default();
        assert_eq!(o.apply_str("").unwrap(), vec![String::new()]);
        o.apply_str("ts=2 nohls").unwrap();
        assert_eq!(o.apply_str("").unwrap(), vec!["tabstop=2  nohlstrings"]);
        assert_eq!(
            o.apply_str("all").unwrap(),
            vec!["tabstop=2  undowindow=1000  wrapscan  noignorecase  nohlstrings  hlnumbers"]
        );
    }

    #[test]
    fn bad_word_changes_nothing() {
        let mut o = Options::default();
        assert_eq!(o.apply_str("ts=8 bogus"), Err(OptionError::Unknown("bogus".into())));
        assert_eq!(o.apply_str("nows ts!"), Err(OptionError::NotBoolean("ts".into())));
        assert_eq!(o, Options::default());
    }

    #[test]
    fn highlight_overrides() {
        let base = HighlightFlags::STRINGS | HighlightFlags::NUMBERS;
        let mut o = Options::default();
        assert_eq!(o.highlight_flags(base), base);
        o.apply_str("nohlstrings").unwrap();
        assert_eq!(o.highlight_flags(base), HighlightFlags::NUMBERS);
        o.apply_str("hls").unwrap();
        assert_eq!(o.highlight_flags(HighlightFlags::empty()), HighlightFlags::STRINGS);
    }
}
