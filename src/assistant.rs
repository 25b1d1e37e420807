//! Per-tab decision flow.
//!
//! On every tab event the assistant scans the tab's page for login fields,
//! checks which stored entries are authorized for the page, folds that and
//! the backend status into an indicator, and pushes the indicator to the
//! browser if no fresher computation for the tab has been applied.
//!
//! Nothing here returns an error to the host. Backend failures degrade to
//! "unreachable", unreadable pages and frames contribute no fields, and a tab
//! that cannot be resolved leaves the previous indicator untouched.

use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{BackendStatus, CredentialBackend};
use crate::config::{find_site_preference, Config, SitePreference};
use crate::dom::Selector;
use crate::fields::{FieldClassifier, FieldSummary};
use crate::host::{BrowserHost, PageSnapshot, TabId};
use crate::indicator::{resolve_indicator, Indicator, IndicatorBoard, IndicatorInputs};
use crate::otp::OtpHeuristic;
use crate::site::{matching_entries, normalize_url, parse_page_url};

/// What triggered a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabEvent {
    Activated,
    NavigationCompleted,
    /// The content layer reported new login fields on the page.
    FieldsDetected,
}

/// Outcome of one recomputation for a tab.
#[derive(Debug, Clone, Serialize)]
pub struct TabDecision {
    pub tab: TabId,
    /// Normalized page URL, if the tab had a scriptable page.
    pub url: Option<String>,
    pub fields: Vec<FieldSummary>,
    /// Names of stored entries whose site pattern authorizes the page.
    pub matched_entries: Vec<String>,
    pub indicator: Indicator,
    /// `false` when a fresher computation for the tab won.
    pub applied: bool,
}

pub struct Assistant {
    backend: Arc<dyn CredentialBackend>,
    host: Arc<dyn BrowserHost>,
    classifier: FieldClassifier,
    sites: RwLock<Vec<SitePreference>>,
    board: Mutex<IndicatorBoard>,
}

impl Assistant {
    pub fn new(
        backend: Arc<dyn CredentialBackend>,
        host: Arc<dyn BrowserHost>,
        config: &Config,
    ) -> Self {
        Self {
            backend,
            host,
            classifier: FieldClassifier::new(OtpHeuristic::new(&config.otp)),
            sites: RwLock::new(config.sites.clone()),
            board: Mutex::new(IndicatorBoard::new()),
        }
    }

    /// Recompute the indicator of `tab`, or of the focused tab when `None`.
    ///
    /// Returns `None` when no tab could be resolved; the previous indicator
    /// stays as it was.
    pub async fn handle(&self, tab: Option<TabId>, event: TabEvent) -> Option<TabDecision> {
        let tab = match tab {
            Some(tab) => tab,
            None => self.resolve_active_tab().await?,
        };

        let ticket = {
            let mut board = self.board.lock().expect("indicator board lock poisoned");
            match event {
                TabEvent::NavigationCompleted => board.begin_navigation(tab),
                TabEvent::Activated | TabEvent::FieldsDetected => board.begin(tab),
            }
        };
        debug!(tab = %tab, ?event, seq = ticket.seq(), "recomputing indicator");

        let status = match self.backend.status().await {
            Ok(status) => status,
            Err(err) => {
                warn!(tab = %tab, error = %err, "backend status query failed; treating as unreachable");
                BackendStatus::unreachable()
            }
        };

        let page = match self.host.page(tab).await {
            Ok(page) => page,
            Err(err) => {
                warn!(tab = %tab, error = %err, "could not read page; reporting no fields");
                None
            }
        };

        let (url, fields, matched_entries) = match page {
            Some(mut page) => {
                let url = normalize_url(&page.url);
                let fields = self.scan_page(&mut page, &url);
                let matched = if status.is_unlocked() {
                    self.matching_entry_names(&url).await
                } else {
                    Vec::new()
                };
                (Some(url), fields, matched)
            }
            None => (None, Vec::new(), Vec::new()),
        };

        let indicator = resolve_indicator(&IndicatorInputs {
            backend: status,
            candidate_fields: fields.len(),
            matched_entries: matched_entries.len(),
        });

        let applied = self
            .board
            .lock()
            .expect("indicator board lock poisoned")
            .apply(ticket, indicator.clone());

        if applied {
            info!(
                tab = %tab,
                state = %indicator.state,
                badge = %indicator.badge.text,
                fields = fields.len(),
                matched = matched_entries.len(),
                "indicator updated"
            );
            self.host.set_indicator(tab, &indicator);
            self.host.open_popup(tab, indicator.popup);
        }

        Some(TabDecision {
            tab,
            url,
            fields,
            matched_entries,
            indicator,
            applied,
        })
    }

    /// Forget the indicator of a closed tab.
    pub fn tab_closed(&self, tab: TabId) {
        let removed = self
            .board
            .lock()
            .expect("indicator board lock poisoned")
            .close(tab);
        debug!(tab = %tab, had_state = removed.is_some(), "tab closed");
    }

    /// Last applied indicator of `tab`.
    pub fn indicator(&self, tab: TabId) -> Option<Indicator> {
        self.board
            .lock()
            .expect("indicator board lock poisoned")
            .get(tab)
            .cloned()
    }

    /// Stop reporting fields for the site of `url` and tell the content
    /// layer of the focused tab to do the same.
    ///
    /// Returns whether the message reached a tab.
    pub async fn ignore_site(&self, url: &str) -> bool {
        let Some(pattern) = ignore_pattern(url) else {
            warn!(url = %url, "cannot ignore site: unparseable url");
            return false;
        };

        {
            let mut sites = self.sites.write().expect("site preferences lock poisoned");
            if !sites.iter().any(|s| s.ignore && s.pattern == pattern) {
                // Ahead of other preferences so it wins over a reveal trigger.
                sites.insert(0, SitePreference::ignored(pattern.clone()));
            }
        }

        let Some(tab) = self.resolve_active_tab().await else {
            debug!(url = %url, "ignore_site not delivered: no active tab");
            return false;
        };
        match self.host.send_ignore_site(tab, url).await {
            Ok(()) => {
                info!(tab = %tab, pattern = %pattern, "site ignored");
                true
            }
            Err(err) => {
                warn!(tab = %tab, error = %err, "failed to deliver ignore_site");
                false
            }
        }
    }

    async fn resolve_active_tab(&self) -> Option<TabId> {
        match self.host.active_tab().await {
            Ok(Some(tab)) => Some(tab),
            Ok(None) => {
                debug!("no active tab; keeping previous indicator");
                None
            }
            Err(err) => {
                warn!(error = %err, "active tab query failed; keeping previous indicator");
                None
            }
        }
    }

    fn site_preference(&self, url: &str) -> Option<SitePreference> {
        let sites = self.sites.read().expect("site preferences lock poisoned");
        find_site_preference(&sites, url).cloned()
    }

    fn scan_page(&self, page: &mut PageSnapshot, url: &str) -> Vec<FieldSummary> {
        let preference = self.site_preference(url);

        if preference.as_ref().is_some_and(|p| p.ignore) {
            debug!(url = %url, "site ignored; reporting no fields");
            return Vec::new();
        }

        let trigger = match preference.and_then(|p| p.reveal_trigger) {
            Some(raw) => match Selector::parse(&raw) {
                Ok(selector) => Some(selector),
                Err(err) => {
                    warn!(trigger = %raw, error = %err, "ignoring malformed reveal trigger");
                    None
                }
            },
            None => None,
        };

        let candidates = match &trigger {
            Some(trigger) => self
                .classifier
                .scan_after_reveal(&mut page.document, trigger),
            None => self.classifier.scan(&page.document),
        };
        candidates.iter().map(|c| c.summary()).collect()
    }

    async fn matching_entry_names(&self, url: &str) -> Vec<String> {
        let entries = match self.backend.entries_for(url).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(url = %url, error = %err, "stored entries query failed");
                return Vec::new();
            }
        };
        matching_entries(&entries, url)
            .into_iter()
            .map(|entry| entry.name.clone())
            .collect()
    }
}

/// Site pattern covering every page of the origin of `url`.
fn ignore_pattern(url: &str) -> Option<String> {
    let page = parse_page_url(url)?;
    let host = page.host_str().filter(|host| !host.is_empty())?;
    Some(match page.port() {
        Some(port) => format!("{}://{}:{}/*", page.scheme(), host, port),
        None => format!("{}://{}/*", page.scheme(), host),
    })
}
