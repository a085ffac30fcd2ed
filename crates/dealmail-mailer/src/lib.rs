// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound mail for the Dealmail campaign job.
//!
//! Resolves locale-specific templates, builds checkout links, composes
//! [`OutboundMail`](dealmail_core::OutboundMail) values from queue entries,
//! and sends them through the SendGrid v3 API.

pub mod compose;
pub mod link;
pub mod sendgrid;
pub mod templates;

pub use compose::MailComposer;
pub use link::{CheckoutLinks, checkout_url};
pub use sendgrid::SendGridTransport;
pub use templates::TemplateCatalog;
