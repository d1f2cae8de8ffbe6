//! Album page parsing.
//!
//! Reads the album title used for the output folder and the image entries
//! turned into full-size download links.

pub mod parser;
