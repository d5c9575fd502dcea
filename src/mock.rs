//! In-memory DOM driver for unit tests.

use crate::driver::{Click, Driver, ElementHandle, Item, Modifier, MouseButton, Rect, Scope};
use crate::frames::{FrameInfo, FramePath, FrameSelector, FrameTree};
use crate::keys::{self, Key};
use crate::locator::{Locator, TextMatch};
use crate::types::ElementFacts;
use crate::{Error, Result};
use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Own text, rendered before the children.
    pub text: String,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub value: String,
    pub checked: bool,
    pub selected: bool,
    pub hidden: bool,
    pub detached: bool,
    /// Returned by queries but reported stale.
    pub zombie: bool,
    pub frame_doc: Option<usize>,
}

impl Node {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn is_checkbox(&self) -> bool {
        (self.tag == "input" && self.attr("type") == Some("checkbox"))
            || self.attr("role") == Some("checkbox")
    }
}

/// Builder for a set of documents; document 0 is the top.
#[derive(Debug, Default)]
pub(crate) struct MockDom {
    nodes: Vec<Node>,
    docs: Vec<usize>,
    title: String,
}

impl MockDom {
    pub fn new() -> Self {
        let mut dom = Self::default();
        dom.new_doc();
        dom
    }

    fn new_doc(&mut self) -> usize {
        let html = self.nodes.len();
        self.nodes.push(Node {
            tag: "html".into(),
            ..Node::default()
        });
        self.docs.push(html);
        self.add(html, "body", &[], "");
        self.docs.len() - 1
    }

    pub fn body(&self, doc: usize) -> usize {
        self.nodes[self.docs[doc]].children[0]
    }

    pub fn add(&mut self, parent: usize, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
        let id = self.nodes.len();
        let attrs: Vec<(String, String)> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let value = attrs
            .iter()
            .find(|(k, _)| k == "value")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let checked = attrs.iter().any(|(k, _)| k == "checked");
        let selected = attrs.iter().any(|(k, _)| k == "selected");
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            attrs,
            text: text.to_string(),
            parent: Some(parent),
            value,
            checked,
            selected,
            ..Node::default()
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Add an iframe under `parent`; returns the iframe node and the new
    /// document's index.
    pub fn add_frame(&mut self, parent: usize, attrs: &[(&str, &str)]) -> (usize, usize) {
        let frame = self.add(parent, "iframe", attrs, "");
        let doc = self.new_doc();
        self.nodes[frame].frame_doc = Some(doc);
        (frame, doc)
    }

    pub fn set_hidden(&mut self, node: usize) {
        self.nodes[node].hidden = true;
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn set_zombie(&mut self, node: usize) {
        self.nodes[node].zombie = true;
    }

    pub fn into_driver(self) -> MockDriver {
        MockDriver {
            state: RefCell::new(State {
                dom: self,
                current_doc: 0,
                queries: 0,
                frame_tree_calls: 0,
                inputs: 0,
                clicks: Vec::new(),
                stuck_value: None,
                highlights: 0,
                highlight_clears: 0,
                list_visible: None,
                wait_timeout: None,
                releases: 0,
            }),
        }
    }
}

struct State {
    dom: MockDom,
    current_doc: usize,
    queries: usize,
    frame_tree_calls: usize,
    inputs: usize,
    clicks: Vec<(usize, Click)>,
    stuck_value: Option<String>,
    highlights: usize,
    highlight_clears: usize,
    list_visible: Option<bool>,
    wait_timeout: Option<Duration>,
    releases: usize,
}

pub(crate) struct MockDriver {
    state: RefCell<State>,
}

pub(crate) fn handle(node: usize) -> ElementHandle {
    ElementHandle::new(format!("n{node}"))
}

impl MockDriver {
    pub fn queries(&self) -> usize {
        self.state.borrow().queries
    }

    pub fn frame_tree_calls(&self) -> usize {
        self.state.borrow().frame_tree_calls
    }

    pub fn inputs(&self) -> usize {
        self.state.borrow().inputs
    }

    pub fn clicks(&self) -> Vec<(usize, Click)> {
        self.state.borrow().clicks.clone()
    }

    pub fn current_doc(&self) -> usize {
        self.state.borrow().current_doc
    }

    pub fn highlights(&self) -> (usize, usize) {
        let st = self.state.borrow();
        (st.highlights, st.highlight_clears)
    }

    pub fn list_visible(&self) -> Option<bool> {
        self.state.borrow().list_visible
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.state.borrow().wait_timeout
    }

    pub fn releases(&self) -> usize {
        self.state.borrow().releases
    }

    pub fn node(&self, node: usize) -> Node {
        self.state.borrow().dom.nodes[node].clone()
    }

    /// Make `value()` always return `value`, whatever was typed.
    pub fn stick_value(&self, value: &str) {
        self.state.borrow_mut().stuck_value = Some(value.to_string());
    }

    /// Remove a node and its subtree from the document.
    pub fn detach(&self, node: usize) {
        let mut st = self.state.borrow_mut();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            st.dom.nodes[n].detached = true;
            stack.extend(st.dom.nodes[n].children.iter().copied());
        }
    }

    pub fn set_value(&self, node: usize, value: &str) {
        self.state.borrow_mut().dom.nodes[node].value = value.to_string();
    }
}

impl State {
    fn index(&self, element: &ElementHandle) -> Result<usize> {
        let n: usize = element
            .id()
            .strip_prefix('n')
            .and_then(|s| s.parse().ok())
            .filter(|n| *n < self.dom.nodes.len())
            .ok_or_else(|| Error::Driver(format!("unknown handle {element}")))?;
        if self.dom.nodes[n].detached {
            return Err(Error::Driver(format!("stale element {element}")));
        }
        Ok(n)
    }

    fn descendants(&self, node: usize, out: &mut Vec<usize>) {
        for &c in &self.dom.nodes[node].children {
            out.push(c);
            self.descendants(c, out);
        }
    }

    fn full_text(&self, node: usize) -> String {
        let n = &self.dom.nodes[node];
        let mut s = n.text.clone();
        for &c in &n.children {
            s.push_str(&self.full_text(c));
        }
        s
    }

    fn facts(&self, node: usize) -> ElementFacts {
        let n = &self.dom.nodes[node];
        ElementFacts {
            tag: n.tag.clone(),
            input_type: n.attr("type").map(Into::into),
            role: n.attr("role").map(Into::into),
            class: n.attr("class").map(Into::into),
        }
    }

    fn matches(&self, locator: &Locator, node: usize) -> bool {
        let n = &self.dom.nodes[node];
        let attr_is = |name: &str, v: &str| n.attr(name) == Some(v);
        match locator {
            Locator::XPath(_) | Locator::Parent => false,
            Locator::Css(css) => match css.strip_prefix('#') {
                Some(id) => attr_is("id", id),
                None => n.tag == css.to_ascii_lowercase(),
            },
            Locator::Id(v) => attr_is("id", v.as_str()),
            Locator::Name(v) => attr_is("name", v.as_str()),
            Locator::Class(v) => n
                .attr("class")
                .is_some_and(|c| c.split_whitespace().any(|t| t == v.as_str())),
            Locator::ClassContains(v) => n.attr("class").is_some_and(|c| c.contains(v.as_str())),
            Locator::Title(v) => attr_is("title", v.as_str()),
            Locator::Tag(v) => n.tag.eq_ignore_ascii_case(v),
            Locator::LinkText(v) => n.tag == "a" && self.full_text(node).trim() == v.trim(),
            Locator::PartialLinkText(v) => n.tag == "a" && self.full_text(node).contains(v.as_str()),
            Locator::Property { name, value } => attr_is(name.as_str(), value.as_str()),
            Locator::Text { text, mode } => match mode {
                TextMatch::Own => n.text == *text,
                TextMatch::Full => self.full_text(node) == *text,
                TextMatch::Contains => n.text.to_lowercase().contains(&text.to_lowercase()),
            },
            Locator::Placeholder(v) => {
                let field = n.tag == "input" || n.tag == "textarea";
                (field && attr_is("placeholder", v.as_str()))
                    || attr_is("aria-placeholder", v.as_str())
                    || (n.tag == "textarea" && self.full_text(node) == *v)
                    || (n.tag == "input" && n.value == *v)
            }
            Locator::OfType(ty) => ty.matches(&self.facts(node)),
        }
    }

    fn frames_of(&self, doc: usize) -> Vec<usize> {
        let mut all = Vec::new();
        self.descendants(self.dom.docs[doc], &mut all);
        all.into_iter()
            .filter(|&n| self.dom.nodes[n].frame_doc.is_some())
            .collect()
    }

    fn frame_tree(&self, doc: usize) -> Vec<FrameTree> {
        self.frames_of(doc)
            .into_iter()
            .map(|f| {
                let n = &self.dom.nodes[f];
                FrameTree {
                    info: FrameInfo {
                        id: n.attr("id").map(Into::into),
                        name: n.attr("name").map(Into::into),
                        src: n.attr("src").map(Into::into),
                    },
                    children: n.frame_doc.map(|d| self.frame_tree(d)).unwrap_or_default(),
                }
            })
            .collect()
    }

    fn item_nodes(&self, node: usize) -> Vec<usize> {
        self.dom.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&c| matches!(self.dom.nodes[c].tag.as_str(), "option" | "li"))
            .collect()
    }
}

impl Driver for MockDriver {
    async fn find_elements(&self, scope: &Scope, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut st = self.state.borrow_mut();
        st.queries += 1;

        let mut candidates = Vec::new();
        match scope {
            Scope::Root => {
                if *locator == Locator::Parent {
                    return Ok(Vec::new());
                }
                let html = st.dom.docs[st.current_doc];
                candidates.push(html);
                st.descendants(html, &mut candidates);
            }
            Scope::Element(h) => {
                let n = st.index(h)?;
                if *locator == Locator::Parent {
                    return Ok(st.dom.nodes[n].parent.map(handle).into_iter().collect());
                }
                st.descendants(n, &mut candidates);
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|&n| !st.dom.nodes[n].detached && st.matches(locator, n))
            .map(handle)
            .collect())
    }

    async fn frame_tree(&self) -> Result<Vec<FrameTree>> {
        let mut st = self.state.borrow_mut();
        st.frame_tree_calls += 1;
        Ok(st.frame_tree(0))
    }

    async fn switch_to_frame(&self, path: &FramePath) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let mut doc = 0;
        for selector in path.iter() {
            let frames = st.frames_of(doc);
            let found = match selector {
                FrameSelector::Index(i) => frames.get(*i).copied(),
                FrameSelector::Id(id) => frames
                    .into_iter()
                    .find(|&f| st.dom.nodes[f].attr("id") == Some(id.as_str())),
                FrameSelector::Name(name) => frames
                    .into_iter()
                    .find(|&f| st.dom.nodes[f].attr("name") == Some(name.as_str())),
                FrameSelector::XPath(_) => None,
            };
            doc = found
                .and_then(|f| st.dom.nodes[f].frame_doc)
                .ok_or_else(|| Error::Driver(format!("no such frame: {selector}")))?;
        }
        st.current_doc = doc;
        Ok(())
    }

    async fn switch_to_default_frame(&self) -> Result<()> {
        self.state.borrow_mut().current_doc = 0;
        Ok(())
    }

    async fn is_stale(&self, element: &ElementHandle) -> Result<bool> {
        let st = self.state.borrow();
        match st.index(element) {
            Ok(n) => Ok(st.dom.nodes[n].zombie),
            Err(_) => Ok(true),
        }
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st.dom.nodes[n].attr(name).map(Into::into))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st.full_text(n).trim().to_string())
    }

    async fn value(&self, element: &ElementHandle) -> Result<String> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st
            .stuck_value
            .clone()
            .unwrap_or_else(|| st.dom.nodes[n].value.clone()))
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st.dom.nodes[n].tag.clone())
    }

    async fn rect(&self, element: &ElementHandle) -> Result<Rect> {
        self.state.borrow().index(element)?;
        Ok(Rect {
            x: 10.0,
            y: 20.0,
            width: 200.0,
            height: 40.0,
        })
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(!st.dom.nodes[n].hidden)
    }

    async fn is_checked(&self, element: &ElementHandle) -> Result<bool> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st.dom.nodes[n].checked)
    }

    async fn click(&self, element: &ElementHandle, click: Click) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let n = st.index(element)?;
        st.clicks.push((n, click));
        let plain = click.button == MouseButton::Left && click.count == 1 && click.modifier.is_none();
        if plain && st.dom.nodes[n].is_checkbox() {
            let node = &mut st.dom.nodes[n];
            node.checked = !node.checked;
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let n = st.index(element)?;
        st.dom.nodes[n].value.clear();
        Ok(())
    }

    async fn type_chars(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let n = st.index(element)?;
        st.inputs += 1;
        st.dom.nodes[n].value.push_str(text);
        Ok(())
    }

    async fn type_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let strokes = keys::parse(text)?;
        let mut st = self.state.borrow_mut();
        let n = st.index(element)?;
        st.inputs += 1;
        let value = &mut st.dom.nodes[n].value;
        for stroke in strokes {
            match stroke.key {
                Key::Char(c) if !stroke.control && !stroke.alt => value.push(c),
                Key::Named(ref k) if k == "Backspace" => {
                    value.pop();
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn items(&self, element: &ElementHandle) -> Result<Vec<Item>> {
        let st = self.state.borrow();
        let n = st.index(element)?;
        Ok(st
            .item_nodes(n)
            .into_iter()
            .map(|i| Item {
                text: st.full_text(i).trim().to_string(),
                selected: st.dom.nodes[i].selected,
            })
            .collect())
    }

    async fn choose_item(&self, element: &ElementHandle, index: usize, click: Click) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let n = st.index(element)?;
        let items = st.item_nodes(n);
        let target = *items
            .get(index)
            .ok_or_else(|| Error::Driver(format!("no item at {index}")))?;
        st.clicks.push((target, click));

        if click.button == MouseButton::Right {
            return Ok(());
        }
        match click.modifier {
            Some(Modifier::Control) => {
                let node = &mut st.dom.nodes[target];
                node.selected = !node.selected;
            }
            Some(Modifier::Shift) => {
                let anchor = items
                    .iter()
                    .position(|&i| st.dom.nodes[i].selected)
                    .unwrap_or(0);
                let (lo, hi) = (anchor.min(index), anchor.max(index));
                for (pos, &i) in items.iter().enumerate() {
                    st.dom.nodes[i].selected = (lo..=hi).contains(&pos);
                }
            }
            None => {
                for &i in &items {
                    st.dom.nodes[i].selected = i == target;
                }
                let text = st.full_text(target).trim().to_string();
                st.dom.nodes[n].value = text;
            }
        }
        Ok(())
    }

    async fn set_list_visible(&self, element: &ElementHandle, visible: bool) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.index(element)?;
        st.list_visible = Some(visible);
        Ok(())
    }

    async fn highlight(&self, element: &ElementHandle) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.index(element)?;
        st.highlights += 1;
        Ok(())
    }

    async fn clear_highlight(&self) -> Result<()> {
        self.state.borrow_mut().highlight_clears += 1;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state.borrow().dom.title.clone())
    }

    async fn set_wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.state.borrow_mut().wait_timeout = Some(timeout);
        Ok(())
    }

    async fn release_elements(&self) -> Result<()> {
        self.state.borrow_mut().releases += 1;
        Ok(())
    }
}
