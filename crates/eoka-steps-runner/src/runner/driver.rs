//! [`Driver`] over an `eoka` page.
//!
//! Every primitive is a small script evaluated in the top document. Element
//! handles are keys into a registry kept on `window`, so a handle stays
//! usable after the active frame changes. Frames are reached through
//! `contentDocument`, which limits frame traversal to same-origin frames.

use eoka::Page;
use eoka_steps::keys::{self, Key, KeyStroke};
use eoka_steps::{
    Click, Driver, ElementHandle, FrameInfo, FramePath, FrameSelector, FrameTree, Item, Locator,
    Modifier, MouseButton, Rect, Scope,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};
use tracing::debug;

type StepResult<T> = eoka_steps::Result<T>;

/// Handles kept before the registry drops detached elements.
const REGISTRY_PRUNE_AT: usize = 2048;

/// Shared helpers, in scope for every script. `PRUNE_AT` is filled in
/// from [`REGISTRY_PRUNE_AT`].
const PRELUDE: &str = r#"
const R = window.__eokaSteps || (window.__eokaSteps = { seq: 0, els: new Map(), keys: new WeakMap(), marked: null });
const put = el => {
  let k = R.keys.get(el);
  if (!k) {
    if (R.els.size >= PRUNE_AT) {
      for (const [key, old] of R.els) if (!old.isConnected) { R.els.delete(key); R.keys.delete(old); }
    }
    k = 'e' + (++R.seq); R.keys.set(el, k); R.els.set(k, el);
  }
  return k;
};
const get = k => {
  const el = R.els.get(k);
  if (!el) throw new Error('unknown element ' + k);
  return el;
};
const frameDoc = path => {
  let doc = document;
  for (const s of path) {
    const frames = Array.from(doc.querySelectorAll('iframe, frame'));
    let f;
    if (s.index !== undefined) f = frames[s.index];
    else if (s.id !== undefined) f = frames.find(x => x.id === s.id);
    else if (s.name !== undefined) f = frames.find(x => x.name === s.name);
    else f = doc.evaluate(s.xpath, doc, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
    const next = f && f.contentDocument;
    if (!next) throw new Error('no such frame: ' + JSON.stringify(s));
    doc = next;
  }
  return doc;
};
const itemsOf = el => {
  const sel = 'option, li, [role=option], [role=listitem]';
  const direct = Array.from(el.children).filter(c => c.matches(sel));
  return direct.length ? direct : Array.from(el.querySelectorAll(sel));
};
"#;

/// Expects `el` and `o` (click options).
const CLICK_JS: &str = r#"
if (o.scroll) el.scrollIntoView({ block: 'center', inline: 'center' });
const r = el.getBoundingClientRect();
const x = r.left + (o.x ?? r.width / 2);
const y = r.top + (o.y ?? r.height / 2);
const view = el.ownerDocument.defaultView;
const fire = (type, detail) => el.dispatchEvent(new view.MouseEvent(type, {
  bubbles: true, cancelable: true, composed: true, view,
  clientX: x, clientY: y, button: o.button, buttons: o.button === 2 ? 2 : 1,
  detail, shiftKey: o.shift, ctrlKey: o.ctrl,
}));
if (typeof el.focus === 'function') el.focus();
if (o.button === 2) {
  fire('mousedown', 1); fire('mouseup', 1); fire('contextmenu', 1);
  return true;
}
for (let i = 1; i <= o.count; i++) { fire('mousedown', i); fire('mouseup', i); fire('click', i); }
if (o.count > 1) fire('dblclick', o.count);
return true;
"#;

/// Expects `el`, `i` (0-based) and `o`. Native selects are changed in
/// place; other lists return the item's key for a real click.
const CHOOSE_JS: &str = r#"
if (el.tagName === 'SELECT') {
  const opt = el.options[i];
  if (!opt) throw new Error('no item ' + i);
  if (el.multiple && o.ctrl) {
    opt.selected = !opt.selected;
  } else if (el.multiple && o.shift) {
    const from = Math.max(0, el.selectedIndex);
    const [a, b] = from <= i ? [from, i] : [i, from];
    Array.from(el.options).forEach((x, n) => { x.selected = n >= a && n <= b; });
  } else {
    el.selectedIndex = i;
  }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return null;
}
const item = itemsOf(el)[i];
if (!item) throw new Error('no item ' + i);
return put(item);
"#;

const ITEMS_JS: &str = r#"
if (el.tagName === 'SELECT') {
  return Array.from(el.options).map(o => ({ text: o.text.trim(), selected: o.selected }));
}
return itemsOf(el).map(i => ({
  text: (i.innerText ?? i.textContent ?? '').trim(),
  selected: i.selected === true
    || i.getAttribute('aria-selected') === 'true'
    || i.classList.contains('selected'),
}));
"#;

const FRAME_TREE_JS: &str = r#"
const walk = d => Array.from(d.querySelectorAll('iframe, frame')).map(f => {
  let children = [];
  try { if (f.contentDocument) children = walk(f.contentDocument); } catch (e) {}
  return { id: f.id || null, name: f.name || null, src: f.getAttribute('src'), children };
});
return walk(document);
"#;

#[derive(Deserialize)]
struct FrameEntry {
    id: Option<String>,
    name: Option<String>,
    src: Option<String>,
    #[serde(default)]
    children: Vec<FrameEntry>,
}

impl From<FrameEntry> for FrameTree {
    fn from(e: FrameEntry) -> Self {
        FrameTree {
            info: FrameInfo {
                id: e.id,
                name: e.name,
                src: e.src,
            },
            children: e.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
struct Bounds {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Deserialize)]
struct ItemEntry {
    text: String,
    selected: bool,
}

/// Drives one `eoka` page.
pub struct EokaDriver {
    page: Page,
    frame: RefCell<FramePath>,
    wait_timeout: Cell<Duration>,
}

impl EokaDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            frame: RefCell::new(FramePath::top()),
            wait_timeout: Cell::new(Duration::ZERO),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn eval<T: DeserializeOwned>(&self, body: &str) -> StepResult<T> {
        let path = self.frame.borrow().clone();
        self.eval_in(&path, body).await
    }

    async fn eval_in<T: DeserializeOwned>(&self, path: &FramePath, body: &str) -> StepResult<T> {
        let js = format!(
            "(() => {{\nconst PRUNE_AT = {};\n{}\nconst doc = frameDoc({});\n{}\n}})()",
            REGISTRY_PRUNE_AT,
            PRELUDE,
            frame_json(path),
            body
        );
        self.page.evaluate(&js).await.map_err(driver_err)
    }

    /// Run `body` with `el` bound to the handle's element.
    async fn on<T: DeserializeOwned>(&self, element: &ElementHandle, body: &str) -> StepResult<T> {
        self.eval(&format!("const el = {};\n{}", element_ref(element), body))
            .await
    }

    /// Wait, up to the configured timeout, for the active document to
    /// finish loading.
    async fn wait_until_ready(&self) -> StepResult<()> {
        let timeout = self.wait_timeout.get();
        if timeout.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + timeout;
        loop {
            let ready: bool = self.eval("return doc.readyState === 'complete';").await?;
            if ready || Instant::now() >= deadline {
                return Ok(());
            }
            self.page.wait(100).await;
        }
    }

    /// Run a lookup script until it returns something or, for queries
    /// against the document itself, the wait timeout runs out.
    async fn poll_elements(&self, scope: &Scope, locator: &Locator, body: &str) -> StepResult<Vec<String>> {
        let timeout = self.wait_timeout.get();
        let deadline = Instant::now() + timeout;
        loop {
            let keys: Vec<String> = self.eval(body).await?;
            if !keys.is_empty() || !waits_for(scope, locator, timeout) || Instant::now() >= deadline {
                return Ok(keys);
            }
            self.page.wait(100).await;
        }
    }

    async fn focus(&self, element: &ElementHandle) -> StepResult<()> {
        let _: bool = self
            .on(element, "if (typeof el.focus === 'function') el.focus(); return true;")
            .await?;
        Ok(())
    }

    /// Synthetic key events for strokes with modifiers held.
    async fn chord(&self, element: &ElementHandle, stroke: &KeyStroke) -> StepResult<()> {
        let key = match stroke.key {
            Key::Char(c) => c.to_string(),
            Key::Named(ref name) => name.clone(),
        };
        let opts = json!({
            "key": key,
            "ctrlKey": stroke.control,
            "shiftKey": stroke.shift,
            "altKey": stroke.alt,
            "bubbles": true,
            "cancelable": true,
        });
        let body = format!(
            "const o = {};\n\
             const view = el.ownerDocument.defaultView;\n\
             el.dispatchEvent(new view.KeyboardEvent('keydown', o));\n\
             el.dispatchEvent(new view.KeyboardEvent('keyup', o));\n\
             return true;",
            opts
        );
        let _: bool = self.on(element, &body).await?;
        Ok(())
    }
}

/// Only document-wide queries wait for content to appear; lookups below an
/// element run while matching one candidate after another.
fn waits_for(scope: &Scope, locator: &Locator, timeout: Duration) -> bool {
    !timeout.is_zero() && matches!(scope, Scope::Root) && !matches!(locator, Locator::Parent)
}

fn driver_err(e: eoka::Error) -> eoka_steps::Error {
    eoka_steps::Error::Driver(e.to_string())
}

fn js_str(s: &str) -> String {
    Value::from(s).to_string()
}

fn element_ref(element: &ElementHandle) -> String {
    format!("get({})", js_str(element.id()))
}

fn frame_json(path: &FramePath) -> Value {
    path.iter()
        .map(|s| match s {
            FrameSelector::Index(i) => json!({ "index": i }),
            FrameSelector::Id(id) => json!({ "id": id }),
            FrameSelector::Name(name) => json!({ "name": name }),
            FrameSelector::XPath(x) => json!({ "xpath": x }),
        })
        .collect()
}

fn click_json(click: &Click) -> Value {
    json!({
        "button": if click.button == MouseButton::Right { 2 } else { 0 },
        "count": click.count.max(1),
        "x": click.offset.map(|p| p.x),
        "y": click.offset.map(|p| p.y),
        "shift": click.modifier == Some(Modifier::Shift),
        "ctrl": click.modifier == Some(Modifier::Control),
        "scroll": click.scroll_into_view,
    })
}

impl Driver for EokaDriver {
    async fn find_elements(&self, scope: &Scope, locator: &Locator) -> StepResult<Vec<ElementHandle>> {
        self.wait_until_ready().await?;

        let ctx = match scope {
            Scope::Root => "doc".to_string(),
            Scope::Element(el) => element_ref(el),
        };
        let body = match locator {
            Locator::Parent => format!("const p = {}.parentElement; return p ? [put(p)] : [];", ctx),
            Locator::Css(css) => format!(
                "return Array.from({}.querySelectorAll({})).map(put);",
                ctx,
                js_str(css)
            ),
            other => {
                let relative = matches!(scope, Scope::Element(_));
                let xpath = other.to_xpath(relative).unwrap_or_default();
                format!(
                    "const c = {};\n\
                     const r = (c.ownerDocument || doc).evaluate({}, c, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\n\
                     const out = [];\n\
                     for (let i = 0; i < r.snapshotLength; i++) {{\n\
                       const n = r.snapshotItem(i);\n\
                       if (n.nodeType === 1) out.push(put(n));\n\
                     }}\n\
                     return out;",
                    ctx,
                    js_str(&xpath)
                )
            }
        };

        let keys = self.poll_elements(scope, locator, &body).await?;
        debug!("{:?} in {:?}: {} elements", locator, scope, keys.len());
        Ok(keys.into_iter().map(ElementHandle::new).collect())
    }

    async fn frame_tree(&self) -> StepResult<Vec<FrameTree>> {
        let entries: Vec<FrameEntry> = self.eval_in(&FramePath::top(), FRAME_TREE_JS).await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn switch_to_frame(&self, path: &FramePath) -> StepResult<()> {
        // Fails inside the script when a selector does not resolve.
        let _: bool = self.eval_in(path, "return true;").await?;
        *self.frame.borrow_mut() = path.clone();
        Ok(())
    }

    async fn switch_to_default_frame(&self) -> StepResult<()> {
        *self.frame.borrow_mut() = FramePath::top();
        Ok(())
    }

    async fn title(&self) -> StepResult<String> {
        self.wait_until_ready().await?;
        self.eval_in(&FramePath::top(), "return document.title;").await
    }

    async fn release_elements(&self) -> StepResult<()> {
        let _: bool = self
            .eval_in(
                &FramePath::top(),
                "R.els.clear(); R.keys = new WeakMap(); R.marked = null; return true;",
            )
            .await?;
        debug!("element registry cleared");
        Ok(())
    }

    async fn is_stale(&self, element: &ElementHandle) -> StepResult<bool> {
        let body = format!(
            "const el = R.els.get({}); return !el || !el.isConnected;",
            js_str(element.id())
        );
        self.eval_in(&FramePath::top(), &body).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> StepResult<Option<String>> {
        self.on(element, &format!("return el.getAttribute({});", js_str(name)))
            .await
    }

    async fn text(&self, element: &ElementHandle) -> StepResult<String> {
        self.on(element, "return (el.innerText ?? el.textContent ?? '').trim();")
            .await
    }

    async fn value(&self, element: &ElementHandle) -> StepResult<String> {
        self.on(
            element,
            "return typeof el.value === 'string' ? el.value : (el.textContent ?? '');",
        )
        .await
    }

    async fn tag_name(&self, element: &ElementHandle) -> StepResult<String> {
        self.on(element, "return el.tagName.toLowerCase();").await
    }

    async fn rect(&self, element: &ElementHandle) -> StepResult<Rect> {
        let b: Bounds = self
            .on(
                element,
                "const r = el.getBoundingClientRect(); return { x: r.x, y: r.y, width: r.width, height: r.height };",
            )
            .await?;
        Ok(Rect {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
        })
    }

    async fn is_visible(&self, element: &ElementHandle) -> StepResult<bool> {
        self.on(
            element,
            "const r = el.getBoundingClientRect();\n\
             const s = el.ownerDocument.defaultView.getComputedStyle(el);\n\
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
        )
        .await
    }

    async fn is_checked(&self, element: &ElementHandle) -> StepResult<bool> {
        self.on(
            element,
            "return typeof el.checked === 'boolean' ? el.checked : el.getAttribute('aria-checked') === 'true';",
        )
        .await
    }

    async fn click(&self, element: &ElementHandle, click: Click) -> StepResult<()> {
        let body = format!("const o = {};\n{}", click_json(&click), CLICK_JS);
        let _: bool = self.on(element, &body).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> StepResult<()> {
        let _: bool = self
            .on(
                element,
                "if (typeof el.focus === 'function') el.focus();\n\
                 if (typeof el.value === 'string') el.value = '';\n\
                 else if (el.isContentEditable) el.textContent = '';\n\
                 el.dispatchEvent(new Event('input', { bubbles: true }));\n\
                 el.dispatchEvent(new Event('change', { bubbles: true }));\n\
                 return true;",
            )
            .await?;
        Ok(())
    }

    async fn type_chars(&self, element: &ElementHandle, text: &str) -> StepResult<()> {
        self.focus(element).await?;
        self.page.type_text(text).await.map_err(driver_err)
    }

    async fn type_keys(&self, element: &ElementHandle, text: &str) -> StepResult<()> {
        let strokes = keys::parse(text)?;
        self.focus(element).await?;

        let mut pending = String::new();
        for stroke in &strokes {
            match stroke.key {
                Key::Char(c) if !stroke.has_modifiers() => {
                    pending.push(c);
                    continue;
                }
                _ => {}
            }
            if !pending.is_empty() {
                self.page.type_text(&pending).await.map_err(driver_err)?;
                pending.clear();
            }
            match stroke.key {
                Key::Named(ref name) if !stroke.has_modifiers() => {
                    self.page.human().press_key(name).await.map_err(driver_err)?;
                }
                _ => self.chord(element, stroke).await?,
            }
        }
        if !pending.is_empty() {
            self.page.type_text(&pending).await.map_err(driver_err)?;
        }
        Ok(())
    }

    async fn items(&self, element: &ElementHandle) -> StepResult<Vec<Item>> {
        let entries: Vec<ItemEntry> = self.on(element, ITEMS_JS).await?;
        Ok(entries
            .into_iter()
            .map(|e| Item {
                text: e.text,
                selected: e.selected,
            })
            .collect())
    }

    async fn choose_item(&self, element: &ElementHandle, index: usize, click: Click) -> StepResult<()> {
        let body = format!(
            "const i = {};\nconst o = {};\n{}",
            index,
            click_json(&click),
            CHOOSE_JS
        );
        let item: Option<String> = self.on(element, &body).await?;
        match item {
            Some(key) => self.click(&ElementHandle::new(key), click).await,
            None => Ok(()),
        }
    }

    async fn set_list_visible(&self, element: &ElementHandle, visible: bool) -> StepResult<()> {
        let body = format!(
            "const show = {};\n\
             if (el.tagName === 'SELECT') {{\n\
               if (show) el.size = Math.min(Math.max(el.options.length, 2), 10);\n\
               else el.removeAttribute('size');\n\
               return true;\n\
             }}\n\
             const open = el.getAttribute('aria-expanded') === 'true';\n\
             if (open !== show) el.click();\n\
             return true;",
            visible
        );
        let _: bool = self.on(element, &body).await?;
        Ok(())
    }

    async fn highlight(&self, element: &ElementHandle) -> StepResult<()> {
        let _: bool = self
            .on(
                element,
                "if (R.marked) R.marked.el.style.outline = R.marked.outline;\n\
                 R.marked = { el, outline: el.style.outline };\n\
                 el.style.outline = '2px solid red';\n\
                 return true;",
            )
            .await?;
        Ok(())
    }

    async fn clear_highlight(&self) -> StepResult<()> {
        let _: bool = self
            .eval_in(
                &FramePath::top(),
                "if (R.marked) { R.marked.el.style.outline = R.marked.outline; R.marked = null; }\n\
                 return true;",
            )
            .await?;
        Ok(())
    }

    async fn set_wait_timeout(&self, timeout: Duration) -> StepResult<()> {
        self.wait_timeout.set(timeout);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eoka_steps::Point;

    #[test]
    fn test_frame_json() {
        let path: FramePath = vec![
            FrameSelector::Index(1),
            FrameSelector::Id("pay".into()),
            FrameSelector::Name("inner".into()),
        ]
        .into();
        assert_eq!(
            frame_json(&path).to_string(),
            r#"[{"index":1},{"id":"pay"},{"name":"inner"}]"#
        );
        assert_eq!(frame_json(&FramePath::top()).to_string(), "[]");
    }

    #[test]
    fn test_click_json() {
        let v = click_json(&Click::right().at(Some(Point { x: 5, y: 6 })));
        assert_eq!(v["button"], 2);
        assert_eq!(v["x"], 5);
        assert_eq!(v["y"], 6);

        let v = click_json(&Click::left().holding(Modifier::Shift).scroll(false));
        assert_eq!(v["button"], 0);
        assert_eq!(v["shift"], true);
        assert_eq!(v["ctrl"], false);
        assert_eq!(v["scroll"], false);
        assert!(v["x"].is_null());
    }

    #[test]
    fn test_waits_for() {
        let secs = Duration::from_secs(2);
        let css = Locator::Css("button".into());
        assert!(waits_for(&Scope::Root, &css, secs));
        assert!(!waits_for(&Scope::Root, &css, Duration::ZERO));
        assert!(!waits_for(&Scope::Root, &Locator::Parent, secs));
        assert!(!waits_for(&Scope::Element(ElementHandle::new("e1")), &css, secs));
    }

    #[test]
    fn test_element_ref_escapes() {
        let el = ElementHandle::new("e1'\"");
        assert_eq!(element_ref(&el), r#"get("e1'\"")"#);
    }
}
