//! Text encodings and their line terminators.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use memchr::memmem;

use crate::errors::{Result, SortError};

/// Byte sequence that ends a line in a given encoding.
///
/// For UTF-16 the terminator is a two-byte code unit and only matches at even
/// offsets, so an `0x0A` byte inside another code unit is never a line end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTerminator {
    bytes: &'static [u8],
}

impl LineTerminator {
    /// Single-byte `\n`.
    pub const LF: LineTerminator = LineTerminator { bytes: b"\n" };
    /// `\n` as a UTF-16 little-endian code unit.
    pub const LF_UTF16LE: LineTerminator = LineTerminator { bytes: &[0x0A, 0x00] };
    /// `\n` as a UTF-16 big-endian code unit.
    pub const LF_UTF16BE: LineTerminator = LineTerminator { bytes: &[0x00, 0x0A] };

    /// The terminator bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'static [u8] {
        self.bytes
    }

    /// Length of the terminator, which is also the code unit size.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Offset of the first terminator in `haystack`.
    #[must_use]
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        match self.bytes {
            [b] => memchr::memchr(*b, haystack),
            unit => memmem::find_iter(haystack, unit).find(|pos| pos % unit.len() == 0),
        }
    }

    /// Offset of the last terminator in `haystack`.
    #[must_use]
    pub fn rfind(&self, haystack: &[u8]) -> Option<usize> {
        match self.bytes {
            [b] => memchr::memrchr(*b, haystack),
            unit => memmem::rfind_iter(haystack, unit).find(|pos| pos % unit.len() == 0),
        }
    }

    /// Iterate over the lines of `data`, without terminators.
    ///
    /// A final line without a terminator is yielded; an empty tail is not.
    #[must_use]
    pub fn lines<'a>(&self, data: &'a [u8]) -> Lines<'a> {
        Lines { data, terminator: *self }
    }
}

/// Iterator returned by [`LineTerminator::lines`].
pub struct Lines<'a> {
    data: &'a [u8],
    terminator: LineTerminator,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.data.is_empty() {
            return None;
        }
        match self.terminator.find(self.data) {
            Some(pos) => {
                let line = &self.data[..pos];
                self.data = &self.data[pos + self.terminator.len()..];
                Some(line)
            }
            None => Some(std::mem::take(&mut self.data)),
        }
    }
}

/// Encoding of input and output text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding.name())
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding.name())
    }
}

impl TextEncoding {
    /// UTF-8.
    pub const UTF8: TextEncoding = TextEncoding { encoding: UTF_8 };

    /// Resolve an encoding label such as `utf-8`, `utf-16le` or `windows-1252`.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::UnknownEncoding`] for labels the WHATWG encoding
    /// standard does not define.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| SortError::UnknownEncoding(label.to_string()))
    }

    /// Canonical name of the encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// The line terminator for this encoding.
    #[must_use]
    pub fn terminator(&self) -> LineTerminator {
        if self.encoding == UTF_16LE {
            LineTerminator::LF_UTF16LE
        } else if self.encoding == UTF_16BE {
            LineTerminator::LF_UTF16BE
        } else {
            LineTerminator::LF
        }
    }

    /// Byte order mark of the encoding, empty for encodings without one.
    #[must_use]
    pub fn bom(&self) -> &'static [u8] {
        if self.encoding == UTF_8 {
            &[0xEF, 0xBB, 0xBF]
        } else if self.encoding == UTF_16LE {
            &[0xFF, 0xFE]
        } else if self.encoding == UTF_16BE {
            &[0xFE, 0xFF]
        } else {
            &[]
        }
    }

    /// Decode one line for key derivation.
    ///
    /// Malformed sequences become U+FFFD. A trailing `\r` is dropped so CRLF
    /// files sort the same as LF files; the raw line bytes are left untouched.
    #[must_use]
    pub fn decode_line<'a>(&self, line: &'a [u8]) -> Cow<'a, str> {
        match self.encoding.decode_without_bom_handling(line).0 {
            Cow::Borrowed(s) => Cow::Borrowed(s.strip_suffix('\r').unwrap_or(s)),
            Cow::Owned(mut s) => {
                if s.ends_with('\r') {
                    s.pop();
                }
                Cow::Owned(s)
            }
        }
    }
}
