//! SAML 2.0 message model.
//!
//! Typed representations of the messages an SP-initiated login exchanges,
//! plus the constants and serialization they need.

mod assertion;
mod authn_request;
mod constants;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

/// Escapes a string for use in XML text content or attribute values.
pub(crate) fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::xml_escape;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(xml_escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;");
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(xml_escape("https://sp.example.com/acs"), "https://sp.example.com/acs");
    }
}
