// SPDX-License-Identifier: MIT
//
// cellar-text: the text atoms of the cellar editing core.
//
// Text is stored one Unicode codepoint per cell, with the metadata every
// consumer needs (syntax class, word class, delimiter linkage) packed
// inline next to the codepoint. This crate owns the cell type and the
// pure functions that work on slices of cells: UTF-8 decoding with
// replacement, grapheme cluster boundaries, and display width.
//
// Nothing here knows about files, lines, or buffers. The editor crate
// builds those on top.

pub mod cell;
pub mod grapheme;
pub mod utf8;
pub mod width;

pub use cell::{Cell, CharClass, Neighbor, PairContext, PairKind, PairRole, Syntax, TokenPosition};
