//! # Url Encoder
//!
//! Percent-encoding of query-string components, used when embedding a
//! credential offer in an `openid-credential-offer://` URI and when
//! composing redirect targets.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-').remove(b'~');

/// Percent-encode a single query-string component.
#[must_use]
pub fn component(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}
