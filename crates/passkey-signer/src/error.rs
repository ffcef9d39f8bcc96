//! Errors raised by the Signer Core, drawn from spec.md §7's taxonomy (the
//! subset that can originate inside a signing ceremony; the rest of the
//! taxonomy — `PrfMissing`, `DecryptError`, `RelayLockError`, `ChainError`,
//! `AccountMismatch` — belongs to crates upstream of this one and is folded
//! into `passkey_session::CoreError`).
//!
//! `scrub_error_message` is ported near-verbatim from the teacher's
//! `wasm_signer_worker/src/error.rs`: a specific security property (no
//! secret-bearing JSON field ever reaches a log sink or a caller-visible
//! error string), not boilerplate to regenerate from scratch.

use std::fmt;

#[derive(thiserror::Error)]
pub enum SignerError {
    #[error("input validation failed: {0}")]
    InputValidation(String),

    #[error("intent digest mismatch between UI and signer, or user declined confirmation")]
    IntentMismatch,

    #[error("VRF challenge is outside the freshness window")]
    StaleChallenge,

    #[error("nonce already used in this session")]
    NonceConflict,

    #[error("signing ceremony was cancelled")]
    Cancelled,

    #[error("confirmation handshake timed out")]
    TimedOut,

    #[error("a confirmation handshake is already outstanding")]
    BusyState,

    #[error(transparent)]
    Crypto(#[from] passkey_crypto::CryptoError),
}

pub type SignerResult<T> = Result<T, SignerError>;

#[derive(Clone, Copy)]
enum QuoteStyle {
    Plain,
    Escaped,
}

impl QuoteStyle {
    fn quote(self) -> &'static str {
        match self {
            QuoteStyle::Plain => "\"",
            QuoteStyle::Escaped => "\\\"",
        }
    }

    fn skip_value(self, s: &str) -> Option<&str> {
        match self {
            QuoteStyle::Plain => skip_plain_quoted_value(s),
            QuoteStyle::Escaped => skip_escaped_quoted_value(s),
        }
    }
}

const REDACTED: &str = "[REDACTED]";
const SECRET_STRING_FIELDS: [(&str, QuoteStyle); 16] = [
    ("\"nearPrivateKey\"", QuoteStyle::Plain),
    ("\"near_private_key\"", QuoteStyle::Plain),
    ("\\\"nearPrivateKey\\\"", QuoteStyle::Escaped),
    ("\\\"near_private_key\\\"", QuoteStyle::Escaped),
    ("\"prfOutput\"", QuoteStyle::Plain),
    ("\"prf_output\"", QuoteStyle::Plain),
    ("\\\"prfOutput\\\"", QuoteStyle::Escaped),
    ("\\\"prf_output\\\"", QuoteStyle::Escaped),
    ("\"prfFirst\"", QuoteStyle::Plain),
    ("\"prfSecond\"", QuoteStyle::Plain),
    ("\\\"prfFirst\\\"", QuoteStyle::Escaped),
    ("\\\"prfSecond\\\"", QuoteStyle::Escaped),
    ("\"vrfSecret\"", QuoteStyle::Plain),
    ("\"vrf_secret\"", QuoteStyle::Plain),
    ("\\\"vrfSecret\\\"", QuoteStyle::Escaped),
    ("\\\"vrf_secret\\\"", QuoteStyle::Escaped),
];

fn scrub_json_string_fields(input: &str, patterns: &[(&str, QuoteStyle)]) -> String {
    let mut output = input.to_string();
    for (pattern, quote_style) in patterns {
        output = scrub_json_string_field(&output, pattern, *quote_style);
    }
    output
}

fn scrub_json_string_field(input: &str, key_pattern: &str, quote_style: QuoteStyle) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((before_key, after_key)) = rest.split_once(key_pattern) {
        out.push_str(before_key);
        out.push_str(key_pattern);
        rest = after_key;

        let Some((before_colon, after_colon)) = rest.split_once(':') else {
            out.push_str(rest);
            return out;
        };

        out.push_str(before_colon);
        out.push(':');
        rest = after_colon;

        let (ws, after_ws) = split_while(rest, |ch| ch.is_whitespace());
        out.push_str(ws);
        rest = after_ws;

        let quote = quote_style.quote();
        let Some(after_open) = rest.strip_prefix(quote) else {
            out.push_str(rest);
            return out;
        };

        out.push_str(quote);
        out.push_str(REDACTED);
        out.push_str(quote);

        rest = match quote_style.skip_value(after_open) {
            Some(after_close) => after_close,
            None => return out,
        };
    }

    out.push_str(rest);
    out
}

fn split_while<F>(s: &str, mut pred: F) -> (&str, &str)
where
    F: FnMut(char) -> bool,
{
    let mut end = 0;
    for (idx, ch) in s.char_indices() {
        if pred(ch) {
            end = idx + ch.len_utf8();
        } else {
            break;
        }
    }
    s.split_at(end)
}

fn skip_plain_quoted_value(s: &str) -> Option<&str> {
    let mut escaped = false;
    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            return Some(&s[idx + ch.len_utf8()..]);
        }
    }
    None
}

fn skip_escaped_quoted_value(s: &str) -> Option<&str> {
    s.find("\\\"").map(|idx| &s[idx + 2..])
}

/// Scrub any secret-bearing JSON fields out of a string before it is logged
/// or returned to a caller. Applied at every crate boundary that might
/// surface an upstream error containing a serialized request/response.
pub fn scrub_error_message(message: &str) -> String {
    let scrubbed = scrub_json_string_fields(message, &SECRET_STRING_FIELDS);
    if scrubbed.contains("\"prf\"") || scrubbed.contains("\\\"prf\\\"") {
        scrub_json_string_fields(
            &scrubbed,
            &[
                ("\"first\"", QuoteStyle::Plain),
                ("\"second\"", QuoteStyle::Plain),
                ("\\\"first\\\"", QuoteStyle::Escaped),
                ("\\\"second\\\"", QuoteStyle::Escaped),
            ],
        )
    } else {
        scrubbed
    }
}

impl fmt::Debug for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", scrub_error_message(&self.to_string()))
    }
}
