//! The browser-driver seam.
//!
//! The engine never talks to a browser directly. A [`Driver`] answers element
//! queries, switches frames and performs the primitive gestures the typed
//! handlers compose. `eoka-steps-runner` ships an `eoka`-backed driver.

#![allow(async_fn_in_trait)]

use crate::frames::{FramePath, FrameTree};
use crate::locator::Locator;
use crate::Result;
use std::fmt;
use std::time::Duration;

/// Opaque driver-issued element identity. Equal handles are the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a query starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// The active frame's document.
    #[default]
    Root,
    /// Below (or, for [`Locator::Parent`], above) an element.
    Element(ElementHandle),
}

/// Element bounds in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Offset from an element's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
}

/// Held key while clicking, for multi-selection in lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Shift,
    Control,
}

/// A mouse gesture on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    pub button: MouseButton,
    pub count: u8,
    /// Offset from the top-left corner; the center when `None`.
    pub offset: Option<Point>,
    pub modifier: Option<Modifier>,
    pub scroll_into_view: bool,
}

impl Default for Click {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            count: 1,
            offset: None,
            modifier: None,
            scroll_into_view: true,
        }
    }
}

impl Click {
    pub fn left() -> Self {
        Self::default()
    }

    pub fn double() -> Self {
        Self {
            count: 2,
            ..Self::default()
        }
    }

    pub fn right() -> Self {
        Self {
            button: MouseButton::Right,
            ..Self::default()
        }
    }

    pub fn at(mut self, offset: Option<Point>) -> Self {
        self.offset = offset;
        self
    }

    pub fn holding(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn scroll(mut self, scroll_into_view: bool) -> Self {
        self.scroll_into_view = scroll_into_view;
        self
    }
}

/// One entry of a list or combo box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub text: String,
    pub selected: bool,
}

/// Primitive operations the engine needs from a browser session.
///
/// Queries run in the active frame. Handles stay valid across frame
/// switches until the node leaves the document.
pub trait Driver {
    /// Elements matching `locator` under `scope`, in document order.
    async fn find_elements(&self, scope: &Scope, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// The embedded frames of the top document, recursively.
    async fn frame_tree(&self) -> Result<Vec<FrameTree>>;

    /// Make the frame at `path` (from the top document) active.
    async fn switch_to_frame(&self, path: &FramePath) -> Result<()>;

    async fn switch_to_default_frame(&self) -> Result<()>;

    /// Return to the top document, then descend into `path`.
    async fn reset_frame_context(&self, path: &FramePath) -> Result<()> {
        self.switch_to_default_frame().await?;
        if !path.is_top() {
            self.switch_to_frame(path).await?;
        }
        Ok(())
    }

    /// Whether the node behind `element` has left its document.
    async fn is_stale(&self, element: &ElementHandle) -> Result<bool>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Rendered text content.
    async fn text(&self, element: &ElementHandle) -> Result<String>;

    /// Current value of a form field.
    async fn value(&self, element: &ElementHandle) -> Result<String>;

    /// Lower-case tag name.
    async fn tag_name(&self, element: &ElementHandle) -> Result<String>;

    async fn rect(&self, element: &ElementHandle) -> Result<Rect>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_checked(&self, element: &ElementHandle) -> Result<bool>;

    async fn click(&self, element: &ElementHandle, click: Click) -> Result<()>;

    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    /// Enter text literally, character by character.
    async fn type_chars(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Enter text in [`keys`](crate::keys) notation.
    async fn type_keys(&self, element: &ElementHandle, keys: &str) -> Result<()>;

    /// Entries of a list, list box or select element.
    async fn items(&self, element: &ElementHandle) -> Result<Vec<Item>>;

    /// Apply `click` to the entry at `index` (0-based).
    async fn choose_item(&self, element: &ElementHandle, index: usize, click: Click) -> Result<()>;

    /// Open or close a drop-down's list.
    async fn set_list_visible(&self, element: &ElementHandle, visible: bool) -> Result<()>;

    async fn highlight(&self, element: &ElementHandle) -> Result<()>;

    async fn clear_highlight(&self) -> Result<()>;

    /// Title of the top document.
    async fn title(&self) -> Result<String>;

    /// How long queries wait for elements to appear.
    async fn set_wait_timeout(&self, timeout: Duration) -> Result<()> {
        let _ = timeout;
        Ok(())
    }

    /// Forget every handle issued so far. Called when the session drops its
    /// cached components; later use of an old handle is an error.
    async fn release_elements(&self) -> Result<()> {
        Ok(())
    }
}
