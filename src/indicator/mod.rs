//! Toolbar indicator: the state resolution table and the per-tab board that
//! keeps the last applied state of every open tab.

mod board;
mod state;

pub use board::{IndicatorBoard, Ticket};
pub use state::{
    resolve_indicator, Badge, Indicator, IndicatorInputs, IndicatorState, PopupView, UPDATE_SUFFIX,
};
