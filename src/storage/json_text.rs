//! Plaintext JSON text for stored fields
//!
//! Field values written without a session are stored as JSON text using
//! `", "` and `": "` separators with non-ASCII characters escaped, e.g.
//! `{"a": 1, "name": "caf\u00e9"}`. Rows written by earlier versions of the
//! application use this exact layout. Strings are quoted like any other
//! JSON value, so `"42"` stays a string on the way back.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use crate::error::{VaultError, VaultResult};

/// Serialize a value to the on-disk plaintext form
pub fn to_field_text<T: Serialize + ?Sized>(value: &T) -> VaultResult<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;

    String::from_utf8(buf).map_err(|e| VaultError::Json(format!("Non-UTF-8 JSON output: {}", e)))
}

/// Compact JSON with a space after every separator and ASCII-only output
#[derive(Debug, Clone, Copy, Default)]
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
