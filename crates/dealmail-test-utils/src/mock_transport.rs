// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock mail transport for deterministic testing.
//!
//! `MockTransport` accepts every send with status 202 unless a reply has
//! been scripted for the recipient, and captures every mail it was handed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dealmail_core::{DealmailError, DeliveryReceipt, MailTransport, OutboundMail};

/// A scripted provider answer for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// The provider answers with this status.
    Status(u16),
    /// The call fails with a transport error.
    Error(String),
}

/// A mock mail transport for testing.
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    sent: Arc<Mutex<Vec<OutboundMail>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the reply for every send to `recipient`.
    pub async fn reply_to(&self, recipient: &str, reply: MockReply) {
        self.replies
            .lock()
            .await
            .insert(recipient.to_string(), reply);
    }

    /// Remove all scripted replies.
    pub async fn clear_replies(&self) {
        self.replies.lock().await.clear();
    }

    /// Every mail passed to `send()`, in call order.
    pub async fn sent_mail(&self) -> Vec<OutboundMail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Recipients of every mail passed to `send()`, sorted.
    pub async fn recipients(&self) -> Vec<String> {
        let mut recipients: Vec<String> = self
            .sent
            .lock()
            .await
            .iter()
            .map(|m| m.recipient.clone())
            .collect();
        recipients.sort();
        recipients
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    async fn send(&self, mail: &OutboundMail) -> Result<DeliveryReceipt, DealmailError> {
        self.sent.lock().await.push(mail.clone());
        let reply = self.replies.lock().await.get(&mail.recipient).cloned();
        match reply {
            None => Ok(DeliveryReceipt::accepted(Some(format!(
                "mock-{}",
                uuid::Uuid::new_v4()
            )))),
            Some(MockReply::Status(status)) => Ok(DeliveryReceipt {
                status: Some(status),
                message_id: None,
            }),
            Some(MockReply::Error(message)) => Err(DealmailError::Transport {
                message,
                source: None,
            }),
        }
    }
}
