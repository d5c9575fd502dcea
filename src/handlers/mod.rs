//! Typed action handlers.
//!
//! Every [`ComponentKind`] owns a static keyword table.
//! [`ActionContext::perform`] looks the keyword up case-insensitively and runs
//! the matching operation against a wrapped [`Component`].

mod checkbox;
mod combobox;
mod editbox;
mod generic;
mod listview;
mod text;

use crate::component::Component;
use crate::driver::{Driver, Point, Rect};
use crate::settings::Settings;
use crate::types::{self, ElementType};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

/// The closed set of element kinds a step can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ComponentKind {
    /// Any clickable element.
    #[default]
    Component,
    Button,
    CheckBox,
    ComboBox,
    EditBox,
    #[serde(alias = "List")]
    ListView,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        Self::Component,
        Self::Button,
        Self::CheckBox,
        Self::ComboBox,
        Self::EditBox,
        Self::ListView,
    ];

    /// Name used in messages and as the default declared type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Component => "Component",
            Self::Button => "Button",
            Self::CheckBox => "CheckBox",
            Self::ComboBox => "ComboBox",
            Self::EditBox => "EditBox",
            Self::ListView => "List",
        }
    }

    /// The structural pattern searched for; `None` for the generic kind.
    pub fn element_type(&self) -> Option<&'static ElementType> {
        match self {
            Self::Component => None,
            Self::Button => Some(&types::BUTTON),
            Self::CheckBox => Some(&types::CHECK_BOX),
            Self::ComboBox => Some(&types::COMBO_BOX),
            Self::EditBox => Some(&types::EDIT_BOX),
            Self::ListView => Some(&types::LIST),
        }
    }

    /// Every keyword this kind accepts, in table order.
    pub fn actions(&self) -> Vec<&'static str> {
        let mut keywords: Vec<&'static str> = match self {
            Self::Component | Self::Button => Vec::new(),
            Self::CheckBox => checkbox::ACTIONS.iter().map(|(k, _)| *k).collect(),
            Self::ComboBox => combobox::ACTIONS.iter().map(|(k, _)| *k).collect(),
            Self::EditBox => editbox::ACTIONS.iter().map(|(k, _)| *k).collect(),
            Self::ListView => listview::ACTIONS.iter().map(|(k, _)| *k).collect(),
        };
        match self {
            Self::Component | Self::Button | Self::CheckBox => {
                keywords.extend(generic::ACTIONS.iter().map(|(k, _)| *k))
            }
            _ => keywords.push(generic::EXISTS),
        }
        keywords
    }

    /// Resolve a keyword against this kind's table.
    fn lookup(&self, action: &str) -> Option<Op> {
        let action = action.trim();
        let typed = match self {
            Self::Component | Self::Button => None,
            Self::CheckBox => find(checkbox::ACTIONS, action).map(Op::CheckBox),
            Self::ComboBox => find(combobox::ACTIONS, action).map(Op::ComboBox),
            Self::EditBox => find(editbox::ACTIONS, action).map(Op::EditBox),
            Self::ListView => find(listview::ACTIONS, action).map(Op::ListView),
        };
        if typed.is_some() {
            return typed;
        }
        match self {
            Self::Component | Self::Button | Self::CheckBox => {
                find(generic::ACTIONS, action).map(Op::Generic)
            }
            _ if action.eq_ignore_ascii_case(generic::EXISTS) => Some(Op::Generic(generic::Op::Exists)),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn find<T: Copy>(table: &[(&'static str, T)], action: &str) -> Option<T> {
    table
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(action))
        .map(|(_, op)| *op)
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Generic(generic::Op),
    CheckBox(checkbox::Op),
    ComboBox(combobox::Op),
    EditBox(editbox::Op),
    ListView(listview::Op),
}

/// What a handler gets to work with.
pub struct ActionContext<'a, D> {
    pub driver: &'a D,
    pub component: &'a Component,
    pub settings: &'a Settings,
    /// Session variables; written by actions that store a result.
    pub variables: &'a mut HashMap<String, String>,
}

impl<D: Driver> ActionContext<'_, D> {
    /// Run `action` with `params` for the component's kind.
    pub async fn perform(&mut self, action: &str, params: &[String]) -> Result<()> {
        let kind = self.component.kind;
        let op = kind.lookup(action).ok_or_else(|| Error::NotImplemented {
            action: action.to_string(),
            kind: kind.type_name().to_string(),
        })?;

        match op {
            Op::Generic(op) => generic::perform(self, op, action, params).await,
            Op::CheckBox(op) => checkbox::perform(self, op, action, params).await,
            Op::ComboBox(op) => combobox::perform(self, op, action, params).await,
            Op::EditBox(op) => editbox::perform(self, op, action, params).await,
            Op::ListView(op) => listview::perform(self, op, action, params).await,
        }
    }
}

/// The parameter at `index`, or an invalid-parameter error naming `action`.
fn required<'p>(params: &'p [String], index: usize, action: &str) -> Result<&'p str> {
    params.get(index).map(String::as_str).ok_or_else(|| {
        Error::InvalidParameter(format!(
            "{} needs at least {} parameter{}",
            action,
            index + 1,
            if index == 0 { "" } else { "s" }
        ))
    })
}

/// Parse a 1-based index parameter.
fn parse_index(raw: &str) -> Result<usize> {
    let index: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("'{}' is not a number", raw)))?;
    if index < 1 {
        return Err(Error::InvalidParameter(format!(
            "IndexValue '{}' is not greater than 0",
            raw
        )));
    }
    Ok(index as usize)
}

fn coords_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:coords\s*=\s*)?(-?\d+(?:\.\d+)?)(?:\s*[,;]\s*|\s+)(-?\d+(?:\.\d+)?)\s*$",
        )
        .ok()
    })
    .as_ref()
}

/// Parse `x,y`, `x;y`, `x y` or `Coords=x;y` into raw coordinates.
fn parse_coords(raw: &str) -> Option<(f64, f64)> {
    let caps = coords_pattern()?.captures(raw)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some((x, y))
}

/// Turn a coordinate parameter into an offset inside `rect`. Values strictly
/// between 0 and 1 are fractions of the width or height.
fn offset_in(raw: &str, rect: &Rect) -> Option<Point> {
    let Some((x, y)) = parse_coords(raw) else {
        warn!("ignoring invalid coordinate '{}'", raw);
        return None;
    };
    let scale = |v: f64, extent: f64| {
        if v > 0.0 && v < 1.0 {
            (v * extent).round() as i64
        } else {
            v.round() as i64
        }
    };
    Some(Point {
        x: scale(x, rect.width),
        y: scale(y, rect.height),
    })
}

/// Whether an optional flag parameter is on; anything but `false`, `no`,
/// `off` or `0` counts as on.
fn flag(params: &[String], index: usize, default: bool) -> bool {
    match params.get(index).map(|p| p.trim().to_ascii_lowercase()) {
        Some(p) if p.is_empty() => default,
        Some(p) => !matches!(p.as_str(), "false" | "no" | "off" | "0"),
        None => default,
    }
}

/// Write `items` one per line. Only UTF-8 is produced.
fn write_items(settings: &Settings, file: &str, encoding: Option<&str>, items: &[String]) -> Result<()> {
    if let Some(enc) = encoding.map(str::trim).filter(|e| !e.is_empty()) {
        let utf8 = enc.eq_ignore_ascii_case("utf-8") || enc.eq_ignore_ascii_case("utf8");
        if !utf8 {
            warn!("encoding '{}' is not supported, writing UTF-8", enc);
        }
    }
    let path = settings.resolve_output(file);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = items.join("\n");
    content.push('\n');
    std::fs::write(&path, content)?;
    info!("captured {} items to {}", items.len(), path.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::driver::Scope;
    use crate::frames::FramePath;
    use crate::mock::{handle, MockDriver};

    pub async fn component(driver: &MockDriver, kind: ComponentKind, node: usize) -> Component {
        Component::wrap(driver, kind, handle(node), FramePath::top(), Scope::Root, None)
            .await
            .unwrap()
    }

    /// Run one action with default settings and a scratch variable map.
    pub async fn run(
        driver: &MockDriver,
        kind: ComponentKind,
        node: usize,
        action: &str,
        params: &[&str],
    ) -> Result<()> {
        let mut variables = HashMap::new();
        run_with(driver, &Settings::default(), &mut variables, kind, node, action, params).await
    }

    pub async fn run_with(
        driver: &MockDriver,
        settings: &Settings,
        variables: &mut HashMap<String, String>,
        kind: ComponentKind,
        node: usize,
        action: &str,
        params: &[&str],
    ) -> Result<()> {
        let component = component(driver, kind, node).await;
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        ActionContext {
            driver,
            component: &component,
            settings,
            variables,
        }
        .perform(action, &params)
        .await
    }
}
