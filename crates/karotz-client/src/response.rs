use std::fmt;

use crate::error::{KarotzError, Result};

pub const CODE_TAG: &str = "code";
pub const INTERACTIVE_ID_TAG: &str = "interactiveId";

/// Result indicator carried in the `<code>` element of every vendor response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NotConnected,
    Other(String),
    /// The response had no `<code>` element.
    Missing,
}

impl StatusCode {
    pub fn from_field(value: Option<String>) -> Self {
        match value {
            None => StatusCode::Missing,
            Some(raw) => {
                let code = raw.trim();
                if code.eq_ignore_ascii_case("OK") {
                    StatusCode::Ok
                } else if code.eq_ignore_ascii_case("NOT_CONNECTED") {
                    StatusCode::NotConnected
                } else {
                    StatusCode::Other(code.to_string())
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Ok => f.write_str("OK"),
            StatusCode::NotConnected => f.write_str("NOT_CONNECTED"),
            StatusCode::Other(code) => f.write_str(code),
            StatusCode::Missing => f.write_str("<no code>"),
        }
    }
}

pub fn body_text(body: &[u8]) -> Result<&str> {
    std::str::from_utf8(body)
        .map_err(|err| KarotzError::MalformedResponse(format!("body is not utf-8: {err}")))
}

/// Text content of the first element named `tag`, in document order.
///
/// A missing element is `Ok(None)`; only a body that is not well-formed XML is an error.
/// A DOCTYPE declaration is accepted.
pub fn extract_field(xml: &str, tag: &str) -> Result<Option<String>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let document = roxmltree::Document::parse_with_options(xml, options)
        .map_err(|err| KarotzError::MalformedResponse(err.to_string()))?;
    let value = document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == tag)
        .map(|node| {
            node.descendants()
                .filter(|child| child.is_text())
                .filter_map(|child| child.text())
                .collect::<String>()
        });
    Ok(value)
}

/// Parse the `<code>` element of `xml` into a status.
pub fn status_code(xml: &str) -> Result<StatusCode> {
    Ok(StatusCode::from_field(extract_field(xml, CODE_TAG)?))
}
