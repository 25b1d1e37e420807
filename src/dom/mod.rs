//! DOM snapshot model.
//!
//! The content layer serializes the page (and every readable frame) into an
//! [`Document`] tree. Classification runs over that snapshot, never over the
//! live page, so it stays a pure function that can be re-run from scratch.

mod node;
mod selector;

pub use node::{ComputedStyle, Document, Element, Frame, FrameContent, LayoutBox, NodePath, PathStep};
pub use selector::{Selector, SelectorError};
