// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personalized checkout links.

use dealmail_core::DealmailError;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// URI component encoding set.
/// Leaves unencoded: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const COMPONENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Build `{base_url}/checkout/{price_id}/{identity}` with the identity percent-encoded.
///
/// Fails when any argument is empty or `price_id` is not in `supported`.
pub fn checkout_url(
    base_url: &str,
    identity: &str,
    price_id: &str,
    supported: &[String],
) -> Result<String, DealmailError> {
    let base_url = base_url.trim_end_matches('/');
    if base_url.is_empty() || identity.is_empty() || price_id.is_empty() {
        return Err(DealmailError::LinkBuilder(
            "base url, identity, and price id are all required".to_string(),
        ));
    }
    if !supported.iter().any(|p| p == price_id) {
        return Err(DealmailError::LinkBuilder(format!(
            "unsupported price id `{price_id}`"
        )));
    }

    let identity = utf8_percent_encode(identity, COMPONENT_ENCODE_SET);
    Ok(format!("{base_url}/checkout/{price_id}/{identity}"))
}

/// Checkout link builder bound to one site and its price ids.
#[derive(Debug, Clone)]
pub struct CheckoutLinks {
    base_url: String,
    supported: Vec<String>,
}

impl CheckoutLinks {
    pub fn new(base_url: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            supported,
        }
    }

    pub fn url(&self, identity: &str, price_id: &str) -> Result<String, DealmailError> {
        checkout_url(&self.base_url, identity, price_id, &self.supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> Vec<String> {
        vec!["price_yearly".to_string()]
    }

    #[test]
    fn identity_is_component_encoded() {
        let url = checkout_url(
            "https://shop.example.com",
            "first.last+deal@example.com",
            "price_yearly",
            &prices(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://shop.example.com/checkout/price_yearly/first.last%2Bdeal%40example.com"
        );
    }

    #[test]
    fn unreserved_marks_are_kept() {
        let url = checkout_url("https://s.example", "a-b_c.d!~*'()", "price_yearly", &prices())
            .unwrap();
        assert!(url.ends_with("/a-b_c.d!~*'()"));
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        let url = checkout_url("https://s.example", "äiti@example.fi", "price_yearly", &prices())
            .unwrap();
        assert!(url.ends_with("/%C3%A4iti%40example.fi"));
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let links = CheckoutLinks::new("https://s.example/", prices());
        assert_eq!(
            links.url("a@b.c", "price_yearly").unwrap(),
            "https://s.example/checkout/price_yearly/a%40b.c"
        );
    }

    #[test]
    fn missing_arguments_fail() {
        assert!(checkout_url("", "a@b.c", "price_yearly", &prices()).is_err());
        assert!(checkout_url("https://s.example", "", "price_yearly", &prices()).is_err());
        assert!(checkout_url("https://s.example", "a@b.c", "", &prices()).is_err());
    }

    #[test]
    fn unsupported_price_fails() {
        let err = checkout_url("https://s.example", "a@b.c", "price_other", &prices()).unwrap_err();
        assert!(matches!(err, DealmailError::LinkBuilder(msg) if msg.contains("price_other")));
    }
}
