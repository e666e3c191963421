//! Response normalisation for list payloads.
//!
//! The records API has shipped several envelope shapes over time. A list
//! payload is accepted as, in priority order:
//! 1. a bare JSON array,
//! 2. an object with a `content` array (paged responses),
//! 3. an object with an array under the kind's own name (`{"patients": [...]}`),
//! 4. an object with an `items` array.
//!
//! Anything else yields an empty sequence plus a warning. An unknown shape is
//! a diagnostic, never a failure.

use clinic_models::Resource;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Which envelope a payload matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `[...]`
    BareArray,
    /// `{"content": [...]}`
    Content,
    /// `{"<kind>": [...]}`
    KindAlias,
    /// `{"items": [...]}`
    Items,
    /// None of the above.
    Unrecognized,
}

impl PayloadShape {
    /// Short label used by diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BareArray => "array",
            Self::Content => "content envelope",
            Self::KindAlias => "kind envelope",
            Self::Items => "items envelope",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Entries extracted from a payload, still undecoded.
#[derive(Debug, Clone, Copy)]
pub struct Normalized<'a> {
    /// Envelope that matched.
    pub shape: PayloadShape,
    /// Raw entries in server order.
    pub entries: &'a [Value],
}

/// Records decoded from a normalised payload.
#[derive(Debug, Clone)]
pub struct DecodedBatch<R> {
    /// Envelope that matched.
    pub shape: PayloadShape,
    /// Successfully decoded records in server order.
    pub records: Vec<R>,
    /// Entries that could not be decoded as `R`.
    pub skipped: usize,
}

impl Normalized<'_> {
    /// Decode every entry as `R`, skipping (and logging) entries that do not fit.
    #[must_use]
    pub fn decode<R: Resource>(self) -> DecodedBatch<R> {
        let mut records = Vec::with_capacity(self.entries.len());
        let mut skipped = 0;
        for (index, entry) in self.entries.iter().enumerate() {
            match R::deserialize(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        kind = %R::KIND,
                        index,
                        error = %err,
                        "skipping list entry that does not decode"
                    );
                }
            }
        }
        DecodedBatch {
            shape: self.shape,
            records,
            skipped,
        }
    }
}

/// Locate the record array inside `payload`.
#[must_use]
pub fn normalize<'a>(payload: &'a Value, alias: &str) -> Normalized<'a> {
    if let Value::Array(entries) = payload {
        return Normalized {
            shape: PayloadShape::BareArray,
            entries,
        };
    }

    if let Value::Object(map) = payload {
        let candidates = [
            ("content", PayloadShape::Content),
            (alias, PayloadShape::KindAlias),
            ("items", PayloadShape::Items),
        ];
        for (field, shape) in candidates {
            if let Some(Value::Array(entries)) = map.get(field) {
                return Normalized { shape, entries };
            }
        }
    }

    warn!(
        alias,
        payload = %describe(payload),
        "unrecognized list payload; treating as empty"
    );
    Normalized {
        shape: PayloadShape::Unrecognized,
        entries: &[],
    }
}

/// Normalise and decode in one step.
#[must_use]
pub fn normalize_records<R: Resource>(payload: &Value) -> DecodedBatch<R> {
    normalize(payload, R::KIND.envelope_alias()).decode()
}

/// Compact description of a payload for diagnostics: type plus top-level keys.
#[must_use]
pub fn describe(payload: &Value) -> String {
    match payload {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(text) => format!("string ({} chars)", text.chars().count()),
        Value::Array(entries) => format!("array ({} entries)", entries.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object {{{}}}", keys.join(", "))
        }
    }
}
