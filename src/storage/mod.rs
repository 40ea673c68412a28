//! Persistence-boundary helpers
//!
//! - `file_io`: atomic, optionally owner-only file writes
//! - `field`: encrypt-or-plaintext encoding of individual column values
//! - `json_text`: the plaintext JSON layout used for stored fields

pub mod field;
pub mod file_io;
pub mod json_text;

pub use field::{DecodedField, FieldCodec, FieldSource};
