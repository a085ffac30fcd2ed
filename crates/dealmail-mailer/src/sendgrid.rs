// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SendGrid v3 mail transport.
//!
//! Provides [`SendGridTransport`] which handles request construction,
//! authentication, and mapping of provider answers to delivery receipts.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use dealmail_config::model::MailConfig;
use dealmail_core::{DealmailError, DeliveryReceipt, MailTransport, OutboundMail};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::debug;

/// Path of the send endpoint under the API base URL.
const SEND_PATH: &str = "/v3/mail/send";

/// Response header carrying the provider's message id.
const MESSAGE_ID_HEADER: &str = "x-message-id";

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    dynamic_template_data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct Asm<'a> {
    group_id: u32,
    groups_to_display: &'a [u32],
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    template_id: &'a str,
    asm: Asm<'a>,
}

/// HTTP client for the SendGrid mail send API.
#[derive(Debug, Clone)]
pub struct SendGridTransport {
    client: reqwest::Client,
    endpoint: String,
    sender_address: String,
    sender_name: String,
}

impl SendGridTransport {
    /// Build a transport from the mail configuration.
    ///
    /// Fails when no API key is configured.
    pub fn new(config: &MailConfig) -> Result<Self, DealmailError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DealmailError::Config("mail.api_key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                DealmailError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DealmailError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{SEND_PATH}", config.api_base_url.trim_end_matches('/')),
            sender_address: config.sender_address.clone(),
            sender_name: config.sender_name.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    fn name(&self) -> &str {
        "sendgrid"
    }

    /// Any HTTP answer becomes a receipt; only connection-level failures are errors.
    async fn send(&self, mail: &OutboundMail) -> Result<DeliveryReceipt, DealmailError> {
        let request = SendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &mail.recipient,
                    name: &mail.display_name,
                }],
                dynamic_template_data: &mail.parameters,
            }],
            from: Address {
                email: &self.sender_address,
                name: &self.sender_name,
            },
            template_id: &mail.template_id,
            asm: Asm {
                group_id: mail.unsubscribe.group_id,
                groups_to_display: &mail.unsubscribe.groups_to_display,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| DealmailError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status().as_u16();
        let message_id = response
            .headers()
            .get(MESSAGE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(status, recipient = %mail.recipient, "send response received");

        Ok(DeliveryReceipt {
            status: Some(status),
            message_id,
        })
    }
}
