use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::selector::Selector;

/// Computed style values that decide whether an element is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    /// CSS `display`; `None` means the user agent default.
    pub display: Option<String>,
    /// CSS `visibility`; inherited by descendants unless overridden.
    pub visibility: Option<String>,
}

impl ComputedStyle {
    pub fn is_display_none(&self) -> bool {
        self.display
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case("none"))
    }

    /// `Some(false)` for `hidden`/`collapse`, `Some(true)` for an explicit
    /// `visible`, `None` when inherited.
    pub fn visibility_override(&self) -> Option<bool> {
        let value = self.visibility.as_deref()?.trim().to_ascii_lowercase();
        match value.as_str() {
            "hidden" | "collapse" => Some(false),
            "visible" => Some(true),
            _ => None,
        }
    }
}

/// Layout box recorded by the snapshotting content script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub width: f64,
    pub height: f64,
}

impl LayoutBox {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Load state of a nested frame's document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FrameContent {
    Loaded { document: Document },
    /// Cross-origin frame the content script cannot read.
    Blocked,
    /// Frame that failed to load or was not loaded when the snapshot was taken.
    Unavailable,
}

/// An `<iframe>`/`<frame>` hosted by an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub url: Option<String>,
    pub content: FrameContent,
}

impl Frame {
    pub fn loaded(document: Document) -> Self {
        Self {
            url: document.url.clone(),
            content: FrameContent::Loaded { document },
        }
    }

    pub fn blocked(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            content: FrameContent::Blocked,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.content {
            FrameContent::Loaded { document } => Some(document),
            FrameContent::Blocked | FrameContent::Unavailable => None,
        }
    }
}

/// One element of a DOM snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub rect: Option<LayoutBox>,
    #[serde(default)]
    pub children: Vec<Element>,
    #[serde(default)]
    pub frame: Option<Box<Frame>>,
    /// Selectors of elements this control shows when activated
    /// (a "show login form" toggle, for example).
    #[serde(default)]
    pub reveals: Vec<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn input(input_type: &str) -> Self {
        Self::new("input").with_attr("type", input_type)
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_display(mut self, display: &str) -> Self {
        self.style.display = Some(display.to_string());
        self
    }

    pub fn with_rect(mut self, width: f64, height: f64) -> Self {
        self.rect = Some(LayoutBox { width, height });
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(Box::new(frame));
        self
    }

    pub fn with_reveal(mut self, selector: &str) -> Self {
        self.reveals.push(selector.to_string());
        self
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Attribute lookup, case-insensitive on the name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value lowercased, for substring heuristics.
    pub fn lower_attr(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_ascii_lowercase)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Effective `type` of an input, defaulting to `text` like browsers do.
    pub fn input_type(&self) -> String {
        match self.attr("type").map(str::trim) {
            Some(t) if !t.is_empty() => t.to_ascii_lowercase(),
            _ => "text".to_string(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.has_attr("disabled")
    }

    /// Declared `maxlength`, if present and positive.
    pub fn max_length(&self) -> Option<u32> {
        self.attr("maxlength")?
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Whether this element by itself is rendered. Ancestors are not
    /// considered; the classifier folds those in while walking the tree.
    /// `visibility` is not looked at here since it can be overridden by
    /// descendants.
    pub fn is_rendered(&self) -> bool {
        if self.has_attr("hidden") || self.style.is_display_none() {
            return false;
        }
        if self.is("input") && self.input_type() == "hidden" {
            return false;
        }
        !self.rect.is_some_and(|r| r.is_empty())
    }

    fn reveal(&mut self) {
        self.attributes.retain(|key, _| !key.eq_ignore_ascii_case("hidden"));
        if self.style.is_display_none() {
            self.style.display = None;
        }
        if self.style.visibility_override() == Some(false) {
            self.style.visibility = None;
        }
    }

    /// First element in this subtree (document order) matching `selector`.
    /// Does not descend into frames.
    pub fn find(&self, selector: &Selector) -> Option<&Element> {
        if selector.matches(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(selector))
    }

    fn for_each_match_mut(&mut self, selector: &Selector, f: &mut impl FnMut(&mut Element)) {
        if selector.matches(self) {
            f(self);
        }
        for child in &mut self.children {
            child.for_each_match_mut(selector, f);
        }
    }
}

/// A document snapshot: the root element plus the URL it was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub url: Option<String>,
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { url: None, root }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Simulate activating the control matched by `trigger`: every element
    /// it declares in `reveals` is shown.
    ///
    /// Returns `false` when no control matches; the document is unchanged.
    pub fn activate(&mut self, trigger: &Selector) -> bool {
        let Some(targets) = self.root.find(trigger).map(|control| control.reveals.clone()) else {
            debug!(trigger = %trigger, "reveal trigger not found");
            return false;
        };

        for target in &targets {
            match Selector::parse(target) {
                Ok(selector) => self.root.for_each_match_mut(&selector, &mut Element::reveal),
                Err(err) => {
                    warn!(reveal_target = %target, error = %err, "ignoring malformed reveal target")
                }
            }
        }
        true
    }

    /// Resolve a path produced by a scan back to its element.
    pub fn resolve(&self, path: &NodePath) -> Option<&Element> {
        let mut document = self;
        let mut element = &document.root;
        for step in &path.0 {
            match step {
                PathStep::Child(index) => element = element.children.get(*index)?,
                PathStep::Frame => {
                    document = element.frame.as_ref()?.document()?;
                    element = &document.root;
                }
            }
        }
        Some(element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    Child(usize),
    /// Enter the document of the frame hosted by the current element.
    Frame,
}

/// Location of an element inside a document snapshot, crossing frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Child(index));
        Self(steps)
    }

    pub fn frame(&self) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Frame);
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Number of frame boundaries crossed.
    pub fn frame_depth(&self) -> usize {
        self.0.iter().filter(|s| matches!(s, PathStep::Frame)).count()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|step| match step {
                PathStep::Child(index) => index.to_string(),
                PathStep::Frame => "frame".to_string(),
            })
            .collect();
        f.write_str(&parts.join("/"))
    }
}
