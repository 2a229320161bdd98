//! Localized message lookup.
//!
//! Messages are looked up by key. A [`MessageCatalog`] reads the browser
//! extension `messages.json` layout:
//!
//! ```json
//! { "ledgerConnectionInstructionHeader": { "message": "Prior to clicking confirm:" } }
//! ```
//!
//! Keys missing from the loaded catalog fall back to the built-in English
//! text, and keys unknown to both resolve to the key itself.

use serde::Deserialize;
use std::{collections::HashMap, path::Path};

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
};

pub const HEADER: &str = "ledgerConnectionInstructionHeader";
pub const STEP_ONE: &str = "ledgerConnectionInstructionStepOne";
pub const STEP_TWO: &str = "ledgerConnectionInstructionStepTwo";
pub const STEP_THREE: &str = "ledgerConnectionInstructionStepThree";
pub const STEP_FOUR: &str = "ledgerConnectionInstructionStepFour";
pub const CLOSE_OTHER_APPS: &str = "ledgerConnectionInstructionCloseOtherApps";
pub const CONNECT_VIA_WEBHID: &str = "clickToConnectLedgerViaWebHID";
pub const OPEN_FULL_SCREEN_FOR_WEBHID: &str = "openFullScreenForLedgerWebHid";

const ENGLISH: &[(&str, &str)] = &[
    (HEADER, "Prior to clicking confirm:"),
    (STEP_ONE, "Enable Use Ledger Live under Settings > Advanced"),
    (STEP_TWO, "Open and unlock Ledger Live App"),
    (
        STEP_THREE,
        "Be sure your Ledger is plugged in and to select the Ethereum app",
    ),
    (
        STEP_FOUR,
        "Make sure you have \"smart contract data\" or \"blind signing\" enabled on your Ledger device",
    ),
    (
        CLOSE_OTHER_APPS,
        "Close any other software connected to your device and then click here to refresh.",
    ),
    (CONNECT_VIA_WEBHID, "Click here to connect your Ledger via WebHID"),
    (
        OPEN_FULL_SCREEN_FOR_WEBHID,
        "Go to full screen to connect your Ledger via WebHID.",
    ),
];

/// String lookup by message key.
pub trait Translate: Send + Sync {
    fn t(&self, key: &str) -> String;
}

#[derive(Deserialize)]
struct MessageEntry {
    message: String,
}

/// Message table with built-in English fallback.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Catalog containing only the built-in English messages.
    pub fn english() -> Self {
        Self::default()
    }

    /// Parse a `messages.json` document.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, MessageEntry> = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid messages file: {}", e)))?;
        Ok(Self {
            messages: entries
                .into_iter()
                .map(|(key, entry)| (key, entry.message))
                .collect(),
        })
    }

    /// Load a `messages.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            count = catalog.messages.len(),
            "Loaded message catalog"
        );
        Ok(catalog)
    }
}

impl Translate for MessageCatalog {
    fn t(&self, key: &str) -> String {
        if let Some(message) = self.messages.get(key) {
            return message.clone();
        }
        match ENGLISH.iter().find(|(k, _)| *k == key) {
            Some((_, message)) => message.to_string(),
            None => {
                warn!(key, "Missing message");
                key.to_string()
            }
        }
    }
}
