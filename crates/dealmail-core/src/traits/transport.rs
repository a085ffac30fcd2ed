// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outgoing mail transport.

use async_trait::async_trait;

use crate::error::DealmailError;
use crate::types::{DeliveryReceipt, OutboundMail};

/// Sends one templated email through the mail provider.
///
/// A provider answer of any status is a receipt, not an error. Errors are
/// reserved for failures where no answer was received.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn send(&self, mail: &OutboundMail) -> Result<DeliveryReceipt, DealmailError>;
}
