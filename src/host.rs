//! Browser host abstraction: tab accessors, indicator pushes and messages to
//! the content layer of a tab.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dom::Document;
use crate::indicator::{Indicator, PopupView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The top-level document of a tab, frames included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub document: Document,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, document: Document) -> Self {
        Self {
            url: url.into(),
            document,
        }
    }
}

#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// The focused tab of the current window, if any.
    async fn active_tab(&self) -> Result<Option<TabId>>;

    /// Snapshot of the tab's page once it (and its frames) finished loading.
    ///
    /// `Ok(None)` for tabs without a scriptable page (new tab page, browser
    /// internal pages).
    async fn page(&self, tab: TabId) -> Result<Option<PageSnapshot>>;

    /// Update the toolbar badge for a tab. Fire-and-forget.
    fn set_indicator(&self, tab: TabId, indicator: &Indicator);

    /// Select the popup view opened from the indicator of a tab.
    fn open_popup(&self, tab: TabId, popup: PopupView);

    /// Tell the content layer of `tab` to stop reporting fields for `url`.
    async fn send_ignore_site(&self, tab: TabId, url: &str) -> Result<()>;
}
