//! Per-tab indicator state.
//!
//! Every recomputation takes a [`Ticket`] before its first suspension point
//! and hands it back with the result. Results are applied only if no newer
//! result was applied in the meantime and no navigation started after the
//! ticket was issued, so a slow computation can never overwrite a fresher
//! one or leak state from a page the tab already left.

use std::collections::HashMap;

use tracing::debug;

use super::state::Indicator;
use crate::host::TabId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub tab: TabId,
    seq: u64,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Default)]
struct TabSlot {
    /// Tickets below this were issued before the latest navigation, or
    /// before the slot was created.
    floor: u64,
    applied: u64,
    indicator: Option<Indicator>,
}

#[derive(Debug, Default)]
pub struct IndicatorBoard {
    tabs: HashMap<TabId, TabSlot>,
    /// Shared across tabs so a ticket from a closed tab can never look
    /// fresh to a later slot with the same id.
    last_seq: u64,
}

impl IndicatorBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a recomputation for `tab`.
    pub fn begin(&mut self, tab: TabId) -> Ticket {
        self.last_seq += 1;
        let seq = self.last_seq;
        self.tabs.entry(tab).or_insert_with(|| TabSlot {
            floor: seq,
            ..Default::default()
        });
        Ticket { tab, seq }
    }

    /// Start a recomputation caused by a navigation. Every computation
    /// started earlier for this tab is abandoned.
    pub fn begin_navigation(&mut self, tab: TabId) -> Ticket {
        let ticket = self.begin(tab);
        if let Some(slot) = self.tabs.get_mut(&tab) {
            slot.floor = ticket.seq;
        }
        ticket
    }

    /// Apply a finished computation. Returns `false` if it was discarded.
    pub fn apply(&mut self, ticket: Ticket, indicator: Indicator) -> bool {
        let Some(slot) = self.tabs.get_mut(&ticket.tab) else {
            debug!(tab = %ticket.tab, seq = ticket.seq, "discarding indicator for closed tab");
            return false;
        };
        if ticket.seq < slot.floor || ticket.seq <= slot.applied {
            debug!(
                tab = %ticket.tab,
                seq = ticket.seq,
                applied = slot.applied,
                floor = slot.floor,
                "discarding stale indicator computation"
            );
            return false;
        }
        slot.applied = ticket.seq;
        slot.indicator = Some(indicator);
        true
    }

    /// Last applied indicator for `tab`.
    pub fn get(&self, tab: TabId) -> Option<&Indicator> {
        self.tabs.get(&tab)?.indicator.as_ref()
    }

    /// Forget everything about a closed tab.
    pub fn close(&mut self, tab: TabId) -> Option<Indicator> {
        self.tabs.remove(&tab)?.indicator
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
