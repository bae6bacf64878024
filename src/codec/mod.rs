//! Textual encodings.

pub mod key;
