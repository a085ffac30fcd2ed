// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a queue entry into a ready-to-send email.

use std::collections::BTreeMap;

use dealmail_config::DealmailConfig;
use dealmail_core::{DealmailError, OutboundMail, QueueEntry, UnsubscribeGroup};

use crate::link::CheckoutLinks;
use crate::templates::TemplateCatalog;

/// Template parameter holding the recipient's display name.
pub const FIRST_NAME_PARAM: &str = "firstName";
/// Template parameter holding the personalized checkout link.
pub const CHECKOUT_LINK_PARAM: &str = "checkoutLink";

/// Composes campaign emails from queue entries.
#[derive(Debug, Clone)]
pub struct MailComposer {
    catalog: TemplateCatalog,
    links: CheckoutLinks,
    unsubscribe: UnsubscribeGroup,
}

impl MailComposer {
    pub fn new(catalog: TemplateCatalog, links: CheckoutLinks, unsubscribe: UnsubscribeGroup) -> Self {
        Self {
            catalog,
            links,
            unsubscribe,
        }
    }

    pub fn from_config(config: &DealmailConfig) -> Self {
        Self::new(
            TemplateCatalog::from_config(&config.mail),
            CheckoutLinks::new(config.checkout.base_url.clone(), config.supported_prices()),
            UnsubscribeGroup {
                group_id: config.mail.unsubscribe_group_id,
                groups_to_display: config.mail.unsubscribe_group_ids.clone(),
            },
        )
    }

    /// Resolve the template and checkout link for one entry.
    ///
    /// A failure here concerns only this entry.
    pub fn compose(
        &self,
        entry: &QueueEntry,
        template_key: &str,
        price_id: &str,
    ) -> Result<OutboundMail, DealmailError> {
        let template_id = self.catalog.resolve(template_key, Some(&entry.locale))?;
        let link = self.links.url(&entry.identity, price_id)?;

        let parameters = BTreeMap::from([
            (FIRST_NAME_PARAM.to_string(), entry.display_name.clone()),
            (CHECKOUT_LINK_PARAM.to_string(), link),
        ]);

        Ok(OutboundMail {
            recipient: entry.identity.clone(),
            display_name: entry.display_name.clone(),
            template_id: template_id.to_string(),
            parameters,
            unsubscribe: self.unsubscribe.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn composer() -> MailComposer {
        let templates = BTreeMap::from([(
            "yearlyDeal".to_string(),
            BTreeMap::from([
                ("fi".to_string(), "d-fi".to_string()),
                ("en".to_string(), "d-en".to_string()),
            ]),
        )]);
        MailComposer::new(
            TemplateCatalog::new("en", vec!["fi".into(), "en".into()], templates),
            CheckoutLinks::new("https://shop.example.com", vec!["price_yearly".into()]),
            UnsubscribeGroup {
                group_id: 174152,
                groups_to_display: vec![174152],
            },
        )
    }

    fn entry(locale: &str) -> QueueEntry {
        QueueEntry {
            id: 7,
            identity: "maija@example.com".into(),
            campaign: "yearly".into(),
            locale: locale.into(),
            display_name: "Maija".into(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn composes_template_and_parameters() {
        let mail = composer()
            .compose(&entry("fi-FI"), "yearlyDeal", "price_yearly")
            .unwrap();
        assert_eq!(mail.template_id, "d-fi");
        assert_eq!(mail.recipient, "maija@example.com");
        assert_eq!(mail.parameters[FIRST_NAME_PARAM], "Maija");
        assert_eq!(
            mail.parameters[CHECKOUT_LINK_PARAM],
            "https://shop.example.com/checkout/price_yearly/maija%40example.com"
        );
        assert_eq!(mail.unsubscribe.group_id, 174152);
    }

    #[test]
    fn link_failure_is_reported() {
        let err = composer()
            .compose(&entry("fi"), "yearlyDeal", "price_unknown")
            .unwrap_err();
        assert!(matches!(err, DealmailError::LinkBuilder(_)));
    }
}
