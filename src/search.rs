//! Multi-strategy element search.
//!
//! In the active frame the locator tries, in order:
//!
//! 1. the component scope as a structured [`Recognition`] string, relative to
//!    the resolved parent scope;
//! 2. the component scope as display text: label anchors, their `for`
//!    targets, then the nearest ancestor level holding an element of the
//!    declared type;
//! 3. for edit boxes, fields carrying the text as placeholder or value.
//!
//! When nothing matches and frames are not locked, the same search runs in
//! every frame of the [`FrameIndex`] in pre-order.

use crate::criteria::{strip_quotes, CriterionSpec};
use crate::driver::{Driver, ElementHandle, Scope};
use crate::frames::{FrameContext, FrameIndex};
use crate::locator::{Locator, Recognition, Segment, TextMatch};
use crate::settings::Settings;
use crate::types::{self, ElementFacts, ElementType};
use crate::Result;
use tracing::debug;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Locator,
    Label,
    Placeholder,
    /// Nothing matched.
    None,
}

/// Candidates plus where they were found.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub elements: Vec<ElementHandle>,
    pub frame: FrameContext,
    /// The resolved parent, or the document root.
    pub scope: Scope,
    pub strategy: Strategy,
    /// Set when the structured locator matched; used to refresh a cached
    /// component.
    pub hint: Option<Recognition>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Runs the search strategies against one driver.
pub struct ElementLocator<'a, D> {
    driver: &'a D,
    settings: &'a Settings,
}

impl<'a, D: Driver> ElementLocator<'a, D> {
    pub fn new(driver: &'a D, settings: &'a Settings) -> Self {
        Self { driver, settings }
    }

    /// Search for `spec`, starting in `active` and crossing frames unless
    /// `frame_locked`. The driver is left in the returned frame: the one that
    /// matched, or the last one tried.
    pub async fn search(
        &self,
        spec: &CriterionSpec,
        frames: &mut FrameIndex,
        active: &FrameContext,
        frame_locked: bool,
    ) -> Result<SearchOutcome> {
        let component = Recognition::parse(spec.component_scope());
        let parent = spec.parent_scope().map(str::trim).filter(|p| !p.is_empty());
        let parent_rec = parent.and_then(Recognition::parse);

        // A frame named by the parent or the component pins the search.
        let pinned = parent_rec
            .as_ref()
            .filter(|r| r.has_frames())
            .or(component.as_ref().filter(|r| r.has_frames()))
            .map(|r| r.frames.clone());

        // Never trust the driver's current frame for the first pass.
        let frame = pinned.clone().unwrap_or_else(|| active.clone());
        debug!("resetting frame context to {}", frame);
        self.driver.reset_frame_context(&frame).await?;
        let mut frame = frame;

        let first = self
            .search_in_frame(spec, component.as_ref(), parent, parent_rec.as_ref())
            .await?;
        if !first.is_empty() {
            return Ok(first.into_outcome(frame));
        }
        if frame_locked || pinned.is_some() {
            debug!("no match in {} and frames are pinned", frame);
            return Ok(first.into_outcome(frame));
        }

        let mut last = first;
        for node in frames.nodes(self.driver).await? {
            if node.path == frame {
                continue;
            }
            if let Err(e) = self.driver.reset_frame_context(&node.path).await {
                debug!("skipping frame {}: {}", node.path, e);
                continue;
            }
            frame = node.path;
            last = self
                .search_in_frame(spec, component.as_ref(), parent, parent_rec.as_ref())
                .await?;
            if !last.is_empty() {
                debug!("found {} candidates in frame {}", last.elements.len(), frame);
                break;
            }
        }
        Ok(last.into_outcome(frame))
    }

    async fn search_in_frame(
        &self,
        spec: &CriterionSpec,
        component: Option<&Recognition>,
        parent: Option<&str>,
        parent_rec: Option<&Recognition>,
    ) -> Result<FrameResult> {
        let mut scope = Scope::Root;
        if let Some(parent) = parent {
            match self.resolve_parent(parent, parent_rec).await? {
                Some(el) => scope = Scope::Element(el),
                None => {
                    debug!("parent '{}' not found", parent);
                    return Ok(FrameResult::empty(scope));
                }
            }
        }

        if let Some(rec) = component.filter(|r| !r.segments.is_empty()) {
            let elements = self.query_segments(&scope, &rec.segments).await?;
            if !elements.is_empty() {
                debug!("structured locator '{}' matched {}", rec, elements.len());
                return Ok(FrameResult {
                    elements,
                    scope,
                    strategy: Strategy::Locator,
                    hint: Some(rec.clone()),
                });
            }
        }

        let text = spec.label_text();
        if text.is_empty() {
            return Ok(FrameResult::empty(scope));
        }

        let elements = self
            .find_by_label(text, spec.partial_match(), spec.element_type(), &scope)
            .await?;
        if !elements.is_empty() {
            return Ok(FrameResult {
                elements,
                scope,
                strategy: Strategy::Label,
                hint: None,
            });
        }

        if spec.element_type() == Some(&types::EDIT_BOX) {
            let elements = self
                .driver
                .find_elements(&scope, &Locator::Placeholder(text.to_string()))
                .await?;
            if !elements.is_empty() {
                return Ok(FrameResult {
                    elements,
                    scope,
                    strategy: Strategy::Placeholder,
                    hint: None,
                });
            }
        }

        Ok(FrameResult::empty(scope))
    }

    async fn resolve_parent(
        &self,
        parent: &str,
        parent_rec: Option<&Recognition>,
    ) -> Result<Option<ElementHandle>> {
        if let Some(rec) = parent_rec.filter(|r| !r.segments.is_empty()) {
            let found = self.query_segments(&Scope::Root, &rec.segments).await?;
            return Ok(found.into_iter().next());
        }
        let text = strip_quotes(parent);
        for mode in [TextMatch::Own, TextMatch::Full] {
            let found = self
                .driver
                .find_elements(
                    &Scope::Root,
                    &Locator::Text {
                        text: text.to_string(),
                        mode,
                    },
                )
                .await?;
            if let Some(el) = found.into_iter().next() {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    /// Run an ancestor chain of segments; each is searched inside the first
    /// match of the one before.
    pub async fn query_segments(
        &self,
        scope: &Scope,
        segments: &[Segment],
    ) -> Result<Vec<ElementHandle>> {
        let mut scope = scope.clone();
        let mut found = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            found = self.query_segment(&scope, segment).await?;
            if i + 1 < segments.len() {
                match found.first() {
                    Some(el) => scope = Scope::Element(el.clone()),
                    None => return Ok(Vec::new()),
                }
            }
        }
        Ok(found)
    }

    async fn query_segment(&self, scope: &Scope, segment: &Segment) -> Result<Vec<ElementHandle>> {
        let Some((first, rest)) = segment.locators.split_first() else {
            return Ok(Vec::new());
        };
        let mut found = self.driver.find_elements(scope, first).await?;
        for locator in rest {
            if found.is_empty() {
                break;
            }
            let other = self.driver.find_elements(scope, locator).await?;
            found.retain(|el| other.contains(el));
        }
        if let Some(index) = segment.index {
            found = found.into_iter().nth(index.saturating_sub(1)).into_iter().collect();
        }
        Ok(found)
    }

    /// Label-anchor search for `text`.
    async fn find_by_label(
        &self,
        text: &str,
        partial: bool,
        ty: Option<&'static ElementType>,
        scope: &Scope,
    ) -> Result<Vec<ElementHandle>> {
        let anchors = self.anchors(text, partial, scope).await?;
        if anchors.is_empty() {
            return Ok(anchors);
        }
        let Some(ty) = ty else {
            debug!("no type pattern, {} anchors are the result", anchors.len());
            return Ok(anchors);
        };

        let mut results = Vec::new();
        for anchor in anchors {
            if self.matches_type(&anchor, ty).await? {
                push_unique(&mut results, anchor);
                continue;
            }

            let mut base = anchor.clone();
            if let Some(target_id) = self
                .driver
                .attribute(&anchor, "for")
                .await?
                .filter(|id| !id.trim().is_empty())
            {
                let targets = self
                    .driver
                    .find_elements(&Scope::Root, &Locator::Id(target_id.clone()))
                    .await?;
                if let Some(target) = targets.into_iter().next() {
                    if self.matches_type(&target, ty).await? {
                        debug!("label for '{}' is a {}", target_id, ty);
                        push_unique(&mut results, target);
                        continue;
                    }
                    base = target;
                }
            }

            for el in self.find_in_parents(&base, ty).await? {
                push_unique(&mut results, el);
            }
        }
        Ok(results)
    }

    /// Elements whose text equals `text`, plus case-insensitive substring
    /// matches when `partial`. Identity-deduplicated, first seen first.
    async fn anchors(&self, text: &str, partial: bool, scope: &Scope) -> Result<Vec<ElementHandle>> {
        let mut modes = vec![TextMatch::Own, TextMatch::Full];
        if partial {
            modes.push(TextMatch::Contains);
        }

        let mut anchors = Vec::new();
        for mode in modes {
            let locator = Locator::Text {
                text: text.to_string(),
                mode,
            };
            for el in self.driver.find_elements(scope, &locator).await? {
                push_unique(&mut anchors, el);
            }
        }
        if self.settings.log_details {
            debug!("{} anchors for text '{}'", anchors.len(), text);
        }
        Ok(anchors)
    }

    /// Walk up from `base`, one ancestor at a time, until an ancestor has
    /// descendants of type `ty`.
    async fn find_in_parents(
        &self,
        base: &ElementHandle,
        ty: &'static ElementType,
    ) -> Result<Vec<ElementHandle>> {
        let mut current = base.clone();
        loop {
            let parents = self
                .driver
                .find_elements(&Scope::Element(current.clone()), &Locator::Parent)
                .await?;
            let Some(parent) = parents.into_iter().next() else {
                return Ok(Vec::new());
            };
            let found = self
                .driver
                .find_elements(&Scope::Element(parent.clone()), &Locator::OfType(ty))
                .await?;
            if !found.is_empty() {
                return Ok(found);
            }
            current = parent;
        }
    }

    async fn matches_type(&self, el: &ElementHandle, ty: &ElementType) -> Result<bool> {
        let facts = ElementFacts {
            tag: self.driver.tag_name(el).await?,
            input_type: self.driver.attribute(el, "type").await?,
            role: self.driver.attribute(el, "role").await?,
            class: self.driver.attribute(el, "class").await?,
        };
        Ok(ty.matches(&facts))
    }
}

struct FrameResult {
    elements: Vec<ElementHandle>,
    scope: Scope,
    strategy: Strategy,
    hint: Option<Recognition>,
}

impl FrameResult {
    fn empty(scope: Scope) -> Self {
        Self {
            elements: Vec::new(),
            scope,
            strategy: Strategy::None,
            hint: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn into_outcome(self, frame: FrameContext) -> SearchOutcome {
        SearchOutcome {
            elements: self.elements,
            frame,
            scope: self.scope,
            strategy: self.strategy,
            hint: self.hint,
        }
    }
}

fn push_unique(list: &mut Vec<ElementHandle>, el: ElementHandle) {
    if !list.contains(&el) {
        list.push(el);
    }
}
