use super::{offset_in, parse_index, required, write_items, ActionContext};
use crate::driver::{Click, Driver, Item, Modifier, Point};
use crate::{Error, Result};
use tracing::{debug, info};

/// The mouse gesture applied to a list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Gesture {
    Select,
    Activate,
    RightClick,
    /// Shift-click: extend the selection.
    Extend,
    /// Control-click: add to the selection.
    Another,
}

impl Gesture {
    fn click(self, offset: Option<Point>) -> Click {
        let click = match self {
            Self::Select => Click::left(),
            Self::Activate => Click::double(),
            Self::RightClick => Click::right(),
            Self::Extend => Click::left().holding(Modifier::Shift),
            Self::Another => Click::left().holding(Modifier::Control),
        };
        click.at(offset)
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Op {
    /// `[index, coords?]`
    Index {
        gesture: Gesture,
        verify: bool,
        coords: bool,
    },
    /// `[text, coords?, matchIndex?]`
    Text {
        gesture: Gesture,
        partial: bool,
        verify: bool,
        coords: bool,
    },
    VerifySelection {
        selected: bool,
    },
    VerifyContains,
    SetListContains,
    CaptureItemsToFile,
}

const fn index(gesture: Gesture, verify: bool, coords: bool) -> Op {
    Op::Index {
        gesture,
        verify,
        coords,
    }
}

const fn text(gesture: Gesture, partial: bool, verify: bool, coords: bool) -> Op {
    Op::Text {
        gesture,
        partial,
        verify,
        coords,
    }
}

use Gesture::{Activate, Another, Extend, RightClick, Select};

pub(super) const ACTIONS: &[(&str, Op)] = &[
    ("ActivateIndex", index(Activate, false, false)),
    ("ActivateIndexItem", index(Activate, false, false)),
    ("ActivatePartialMatch", text(Activate, true, false, false)),
    ("ActivateTextItem", text(Activate, false, true, false)),
    ("ActivateUnverifiedTextItem", text(Activate, false, false, false)),
    ("ClickIndex", index(Select, false, false)),
    ("ClickIndexItem", index(Select, false, false)),
    ("SelectIndex", index(Select, true, false)),
    ("SelectIndexItem", index(Select, true, false)),
    ("SelectPartialMatch", text(Select, true, false, false)),
    ("SelectTextItem", text(Select, false, true, false)),
    ("SelectUnverifiedTextItem", text(Select, false, false, false)),
    ("VerifyItemUnselected", Op::VerifySelection { selected: false }),
    ("VerifyListContains", Op::VerifyContains),
    ("VerifySelectedItem", Op::VerifySelection { selected: true }),
    ("CaptureItemsToFile", Op::CaptureItemsToFile),
    ("ExtendSelectionToTextItem", text(Extend, true, true, false)),
    ("SelectAnotherPartialMatch", text(Another, true, true, false)),
    ("SelectAnotherTextItem", text(Another, false, true, false)),
    ("SetListContains", Op::SetListContains),
    ("RightClickTextItem", text(RightClick, false, false, false)),
    ("RightClickUnverifiedTextItem", text(RightClick, false, false, false)),
    ("ActivateTextItemCoords", text(Activate, false, true, true)),
    ("ActivateUnverifiedTextItemCoords", text(Activate, false, false, true)),
    ("RightClickTextItemCoords", text(RightClick, false, false, true)),
    ("RightClickUnverifiedTextItemCoords", text(RightClick, false, false, true)),
    ("SelectIndexItemCoords", index(Select, true, true)),
    ("SelectTextItemCoords", text(Select, false, true, true)),
    ("SelectUnverifiedTextItemCoords", text(Select, false, false, true)),
];

pub(super) async fn perform<D: Driver>(
    ctx: &mut ActionContext<'_, D>,
    op: Op,
    action: &str,
    params: &[String],
) -> Result<()> {
    let first = required(params, 0, action)?;
    let element = &ctx.component.element;

    match op {
        Op::Index {
            gesture,
            verify,
            coords,
        } => {
            let index = parse_index(first)? - 1;
            let offset = item_offset(ctx, params, action, coords).await?;
            let items = ctx.driver.items(element).await?;
            if index >= items.len() {
                return Err(Error::InvalidParameter(format!(
                    "index {} is out of range, the list has {} items",
                    index + 1,
                    items.len()
                )));
            }
            apply(ctx, &items, index, gesture, offset, verify).await
        }
        Op::Text {
            gesture,
            partial,
            verify,
            coords,
        } => {
            let offset = item_offset(ctx, params, action, coords).await?;
            let match_at = if coords { 2 } else { 1 };
            let nth = match params.get(match_at).map(|p| p.trim()).filter(|p| !p.is_empty()) {
                Some(raw) => parse_index(raw)?,
                None => 1,
            };
            let items = ctx.driver.items(element).await?;
            let index = items
                .iter()
                .enumerate()
                .filter(|(_, item)| text_matches(item, first, partial))
                .map(|(i, _)| i)
                .nth(nth - 1)
                .ok_or_else(|| {
                    Error::Verification(format!(
                        "match {} of item '{}' is not in the list",
                        nth, first
                    ))
                })?;
            apply(ctx, &items, index, gesture, offset, verify).await
        }
        Op::VerifySelection { selected } => {
            let items = ctx.driver.items(element).await?;
            let matching: Vec<&Item> = items.iter().filter(|i| i.text == first).collect();
            if matching.is_empty() {
                return Err(Error::Verification(format!("item '{}' is not in the list", first)));
            }
            if !matching.iter().any(|i| i.selected == selected) {
                return Err(Error::Verification(format!(
                    "item '{}' is {}",
                    first,
                    if selected { "not selected" } else { "selected" }
                )));
            }
            Ok(())
        }
        Op::VerifyContains => {
            let items = ctx.driver.items(element).await?;
            if !items.iter().any(|i| i.text == first) {
                return Err(Error::Verification(format!("list does not contain '{}'", first)));
            }
            Ok(())
        }
        Op::SetListContains => {
            let items = ctx.driver.items(element).await?;
            let contains = items.iter().any(|i| i.text == first);
            match params.get(1).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                Some(variable) => {
                    info!("{} = {}", variable, contains);
                    ctx.variables.insert(variable.to_string(), contains.to_string());
                }
                None => info!("list contains '{}': {}", first, contains),
            }
            Ok(())
        }
        Op::CaptureItemsToFile => {
            let items: Vec<String> = ctx
                .driver
                .items(element)
                .await?
                .into_iter()
                .map(|i| i.text)
                .collect();
            write_items(ctx.settings, first, params.get(1).map(String::as_str), &items)
        }
    }
}

/// The offset parameter of a coordinate action, scaled by the list's bounds.
async fn item_offset<D: Driver>(
    ctx: &ActionContext<'_, D>,
    params: &[String],
    action: &str,
    coords: bool,
) -> Result<Option<Point>> {
    if !coords {
        return Ok(None);
    }
    let raw = required(params, 1, action)?;
    let rect = ctx.driver.rect(&ctx.component.element).await?;
    Ok(offset_in(raw, &rect))
}

async fn apply<D: Driver>(
    ctx: &ActionContext<'_, D>,
    items: &[Item],
    index: usize,
    gesture: Gesture,
    offset: Option<Point>,
    verify: bool,
) -> Result<()> {
    let element = &ctx.component.element;
    debug!("{:?} '{}' in {}", gesture, items[index].text, ctx.component.identity());
    ctx.driver.choose_item(element, index, gesture.click(offset)).await?;

    if verify {
        let after = ctx.driver.items(element).await?;
        if !after.get(index).is_some_and(|i| i.selected) {
            return Err(Error::Verification(format!(
                "item '{}' is not selected",
                items[index].text
            )));
        }
    }
    Ok(())
}

fn text_matches(item: &Item, text: &str, partial: bool) -> bool {
    if partial {
        item.text.to_lowercase().contains(&text.to_lowercase())
    } else {
        item.text == text
    }
}
