//! Decoding of the `/open` request body.
//!
//! Callers send either JSON or a urlencoded form. Nothing here fails: a body
//! that is neither is treated as carrying no fields at all.

use serde::Deserialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl OpenRequest {
    /// Trimmed URL, or `None` when absent or blank.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

pub fn decode(raw: &[u8]) -> OpenRequest {
    if raw.is_empty() {
        return OpenRequest::default();
    }
    if let Ok(req) = serde_json::from_slice::<OpenRequest>(raw) {
        return req;
    }
    decode_form(raw).unwrap_or_default()
}

fn decode_form(raw: &[u8]) -> Option<OpenRequest> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw).ok()?;
    let url = pairs.into_iter().find(|(k, _)| k == "url").map(|(_, v)| v);
    Some(OpenRequest { url })
}
