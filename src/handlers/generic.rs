use super::{flag, offset_in, ActionContext};
use crate::driver::{Click, Driver};
use crate::{Error, Result};
use tracing::debug;

/// The keyword that only checks that the element is there.
pub(super) const EXISTS: &str = "GUIDoesExist";

#[derive(Debug, Clone, Copy)]
pub(super) enum Op {
    Click,
    DoubleClick,
    RightClick,
    Exists,
}

pub(super) const ACTIONS: &[(&str, Op)] = &[
    ("Click", Op::Click),
    ("Tap", Op::Click),
    ("DoubleClick", Op::DoubleClick),
    ("RightClick", Op::RightClick),
    (EXISTS, Op::Exists),
];

/// Params: `[coords, autoscroll]`. Trailing verify/refresh flags are
/// accepted and ignored.
pub(super) async fn perform<D: Driver>(
    ctx: &mut ActionContext<'_, D>,
    op: Op,
    _action: &str,
    params: &[String],
) -> Result<()> {
    let element = &ctx.component.element;
    let click = match op {
        Op::Exists => {
            if !ctx.driver.is_visible(element).await? {
                return Err(Error::Verification("element is not visible.".into()));
            }
            return Ok(());
        }
        Op::Click => Click::left(),
        Op::DoubleClick => Click::double(),
        Op::RightClick => Click::right(),
    };

    let offset = match params.first().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        Some(coords) => {
            let rect = ctx.driver.rect(element).await?;
            offset_in(coords, &rect)
        }
        None => None,
    };
    let click = click.at(offset).scroll(flag(params, 1, true));
    debug!("{:?} on {} at {:?}", op, ctx.component.identity(), offset);
    ctx.driver.click(element, click).await
}
