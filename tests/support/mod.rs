#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use credgate::backend::{BackendStatus, CredentialBackend, SiteEntry};
use credgate::dom::{ComputedStyle, Document, Element, Frame};
use credgate::host::{BrowserHost, PageSnapshot, TabId};
use credgate::indicator::{Indicator, IndicatorState, PopupView};
use tokio::sync::Notify;

// --- Page fixtures -------------------------------------------------------

pub fn username() -> Element {
    Element::input("text")
        .with_attr("id", "username")
        .with_attr("name", "username")
}

pub fn password() -> Element {
    Element::input("password")
        .with_attr("id", "password")
        .with_attr("name", "password")
}

pub fn totp() -> Element {
    Element::input("text")
        .with_attr("id", "totp")
        .with_attr("maxlength", "6")
}

pub fn toggle(target: &str) -> Element {
    Element::new("button")
        .with_attr("id", "toggle")
        .with_reveal(target)
}

fn page(children: impl IntoIterator<Item = Element>) -> Document {
    Document::new(Element::new("body").with_child(Element::new("form").with_children(children)))
}

/// Username and password.
pub fn basic1() -> Document {
    page([username(), password()])
}

/// Only a username field.
pub fn basic2() -> Document {
    page([username()])
}

/// Only a password field.
pub fn basic3() -> Document {
    page([password()])
}

/// Username, password and a passcode field.
pub fn basic4() -> Document {
    page([username(), password(), totp()])
}

/// Form inside a `display: none` container shown by the toggle.
pub fn div1() -> Document {
    Document::new(Element::new("body").with_children([
        toggle("#login"),
        Element::new("div")
            .with_attr("id", "login")
            .with_display("none")
            .with_children([username(), password()]),
    ]))
}

/// Form inside a `hidden` container shown by a toggle nested in a menu.
pub fn div2() -> Document {
    Document::new(Element::new("body").with_children([
        Element::new("nav").with_child(toggle("div.login-panel")),
        Element::new("div")
            .with_attr("class", "login-panel modal")
            .with_attr("hidden", "")
            .with_child(Element::new("form").with_children([username(), password()])),
    ]))
}

/// Each field carries its own `hidden` attribute.
pub fn div3() -> Document {
    Document::new(Element::new("body").with_children([
        toggle("input[hidden]"),
        username().with_attr("hidden", ""),
        password().with_attr("hidden", ""),
    ]))
}

/// Form inside a `visibility: hidden` container.
pub fn div4() -> Document {
    Document::new(Element::new("body").with_children([
        toggle("#login"),
        Element::new("div")
            .with_attr("id", "login")
            .with_style(ComputedStyle {
                visibility: Some("hidden".to_string()),
                ..Default::default()
            })
            .with_children([username(), password()]),
    ]))
}

/// Two hidden fields, nothing visible.
pub fn hidden_fields1() -> Document {
    page([
        Element::input("hidden").with_attr("name", "csrf"),
        username().with_attr("hidden", ""),
    ])
}

/// Two hidden fields and one visible one.
pub fn hidden_fields2() -> Document {
    page([
        Element::input("hidden").with_attr("name", "csrf"),
        username().with_attr("hidden", ""),
        password(),
    ])
}

/// Username on the top page, password inside a readable frame, and a
/// cross-origin frame the content layer could not read.
pub fn framed_login() -> Document {
    let inner = Document::new(Element::new("body").with_child(password()))
        .with_url("https://example.com/frame");
    Document::new(Element::new("body").with_children([
        username(),
        Element::new("iframe").with_frame(Frame::loaded(inner)),
        Element::new("iframe").with_frame(Frame::blocked("https://ads.test/")),
        totp(),
    ]))
}

// --- Collaborator mocks --------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub tab: TabId,
    pub state: IndicatorState,
    pub badge: String,
}

#[derive(Default)]
pub struct MockHost {
    pub active: Mutex<Option<TabId>>,
    pub pages: Mutex<HashMap<TabId, PageSnapshot>>,
    pub pushes: Mutex<Vec<Push>>,
    pub popups: Mutex<Vec<(TabId, PopupView)>>,
    pub ignore_messages: Mutex<Vec<(TabId, String)>>,
    pub fail_active_tab: AtomicBool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, tab: TabId, url: &str, document: Document) -> Self {
        self.set_page(tab, url, document);
        self
    }

    pub fn with_active(self, tab: TabId) -> Self {
        *self.active.lock().unwrap() = Some(tab);
        self
    }

    pub fn set_page(&self, tab: TabId, url: &str, document: Document) {
        self.pages
            .lock()
            .unwrap()
            .insert(tab, PageSnapshot::new(url, document));
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn last_push(&self) -> Option<Push> {
        self.pushes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BrowserHost for MockHost {
    async fn active_tab(&self) -> Result<Option<TabId>> {
        if self.fail_active_tab.load(Ordering::SeqCst) {
            anyhow::bail!("tabs.query failed");
        }
        Ok(*self.active.lock().unwrap())
    }

    async fn page(&self, tab: TabId) -> Result<Option<PageSnapshot>> {
        Ok(self.pages.lock().unwrap().get(&tab).cloned())
    }

    fn set_indicator(&self, tab: TabId, indicator: &Indicator) {
        self.pushes.lock().unwrap().push(Push {
            tab,
            state: indicator.state,
            badge: indicator.badge.text.clone(),
        });
    }

    fn open_popup(&self, tab: TabId, popup: PopupView) {
        self.popups.lock().unwrap().push((tab, popup));
    }

    async fn send_ignore_site(&self, tab: TabId, url: &str) -> Result<()> {
        self.ignore_messages
            .lock()
            .unwrap()
            .push((tab, url.to_string()));
        Ok(())
    }
}

pub struct MockBackend {
    pub status: Mutex<BackendStatus>,
    pub fail_status: AtomicBool,
    pub fail_entries: AtomicBool,
    /// (name, site pattern)
    pub entries: Mutex<Vec<(String, String)>>,
    pub entry_queries: AtomicUsize,
    block_next_status: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl MockBackend {
    pub fn new(status: BackendStatus) -> Self {
        Self {
            status: Mutex::new(status),
            fail_status: AtomicBool::new(false),
            fail_entries: AtomicBool::new(false),
            entries: Mutex::new(Vec::new()),
            entry_queries: AtomicUsize::new(0),
            block_next_status: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn with_entry(self, name: &str, pattern: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .push((name.to_string(), pattern.to_string()));
        self
    }

    pub fn set_status(&self, status: BackendStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Make the next status query wait until [`MockBackend::release`].
    pub fn block_next_status(&self) {
        self.block_next_status.store(true, Ordering::SeqCst);
    }

    /// Wait until a blocked status query is in flight.
    pub async fn wait_until_blocked(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl CredentialBackend for MockBackend {
    async fn status(&self) -> Result<BackendStatus> {
        if self.block_next_status.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.fail_status.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(*self.status.lock().unwrap())
    }

    async fn entries_for(&self, _page_url: &str) -> Result<Vec<SiteEntry>> {
        self.entry_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_entries.load(Ordering::SeqCst) {
            anyhow::bail!("database closed mid-query");
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, pattern)| SiteEntry::new(name, "alice", "secret", pattern))
            .collect())
    }
}
