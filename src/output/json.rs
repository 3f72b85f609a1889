//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

/// Envelope around every JSON document the CLI prints
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: ?Sized> {
    pub data: &'a T,
    pub meta: Meta,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Meta {
    /// When the document was produced (RFC 3339)
    pub generated_at: String,

    /// CLI version
    pub version: &'static str,
}

impl Meta {
    fn now() -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Format data as pretty-printed JSON inside an [`Envelope`]
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Envelope {
        data,
        meta: Meta::now(),
    })
}
