//! Login field detection over a DOM snapshot.
//!
//! A scan walks the document depth-first, descending into every readable
//! frame at the position its host element appears. Only inputs that are
//! rendered, visible and enabled are reported. Frames the content layer could
//! not read contribute nothing.

use serde::Serialize;
use tracing::debug;

use crate::dom::{Document, Element, FrameContent, NodePath, Selector};
use crate::otp::OtpHeuristic;

/// Input types that may carry a login, password or passcode.
const CANDIDATE_TYPES: &[&str] = &["text", "email", "tel", "number", "username", "password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Username,
    Password,
    OneTimeCode,
}

/// A login-relevant input found by a scan.
///
/// Borrows the element from the snapshot it was found in; the path resolves
/// the same element again via [`Document::resolve`].
#[derive(Debug, Clone)]
pub struct CandidateField<'a> {
    pub element: &'a Element,
    pub path: NodePath,
    pub kind: FieldKind,
}

/// Owned description of a candidate, for handing to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub path: NodePath,
    pub kind: FieldKind,
    pub input_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

impl CandidateField<'_> {
    pub fn summary(&self) -> FieldSummary {
        FieldSummary {
            path: self.path.clone(),
            kind: self.kind,
            input_type: self.element.input_type(),
            id: self.element.id().map(str::to_string),
            name: self.element.attr("name").map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldClassifier {
    otp: OtpHeuristic,
}

impl FieldClassifier {
    pub fn new(otp: OtpHeuristic) -> Self {
        Self { otp }
    }

    pub fn otp(&self) -> &OtpHeuristic {
        &self.otp
    }

    /// Scan the document as it currently is.
    pub fn scan<'a>(&self, document: &'a Document) -> Vec<CandidateField<'a>> {
        let mut walk = Walk {
            classifier: self,
            found: Vec::new(),
            skipped_frames: 0,
        };
        walk.element(&document.root, NodePath::root(), true);

        debug!(
            url = document.url.as_deref().unwrap_or(""),
            candidates = walk.found.len(),
            skipped_frames = walk.skipped_frames,
            "credential field scan complete"
        );
        walk.found
    }

    /// Activate the reveal `trigger` in the snapshot, then scan.
    ///
    /// A trigger that matches nothing leaves the document untouched, so the
    /// result equals a plain [`FieldClassifier::scan`].
    pub fn scan_after_reveal<'a>(
        &self,
        document: &'a mut Document,
        trigger: &Selector,
    ) -> Vec<CandidateField<'a>> {
        document.activate(trigger);
        self.scan(document)
    }

    fn classify(&self, element: &Element) -> Option<FieldKind> {
        if !element.is("input") || element.is_disabled() {
            return None;
        }
        let input_type = element.input_type();
        if !CANDIDATE_TYPES.contains(&input_type.as_str()) {
            return None;
        }
        if input_type == "password" {
            Some(FieldKind::Password)
        } else if self.otp.is_otp_field(element) {
            Some(FieldKind::OneTimeCode)
        } else {
            Some(FieldKind::Username)
        }
    }
}

struct Walk<'a, 'c> {
    classifier: &'c FieldClassifier,
    found: Vec<CandidateField<'a>>,
    skipped_frames: usize,
}

impl<'a> Walk<'a, '_> {
    /// `visible` is the inherited CSS visibility of the parent.
    fn element(&mut self, element: &'a Element, path: NodePath, visible: bool) {
        // A non-rendered element hides its whole subtree, frames included.
        if !element.is_rendered() {
            return;
        }
        let visible = element.style.visibility_override().unwrap_or(visible);

        if visible {
            if let Some(kind) = self.classifier.classify(element) {
                self.found.push(CandidateField {
                    element,
                    path: path.clone(),
                    kind,
                });
            }
        }

        if let Some(frame) = &element.frame {
            match &frame.content {
                FrameContent::Loaded { document } => {
                    self.element(&document.root, path.frame(), visible)
                }
                FrameContent::Blocked | FrameContent::Unavailable => {
                    debug!(
                        frame_url = frame.url.as_deref().unwrap_or(""),
                        "skipping unreadable frame"
                    );
                    self.skipped_frames += 1;
                }
            }
        }

        for (index, child) in element.children.iter().enumerate() {
            self.element(child, path.child(index), visible);
        }
    }
}
