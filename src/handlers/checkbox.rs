use super::ActionContext;
use crate::driver::{Click, Driver};
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub(super) enum Op {
    Check,
    UnCheck,
}

pub(super) const ACTIONS: &[(&str, Op)] = &[("Check", Op::Check), ("UnCheck", Op::UnCheck)];

pub(super) async fn perform<D: Driver>(
    ctx: &mut ActionContext<'_, D>,
    op: Op,
    _action: &str,
    _params: &[String],
) -> Result<()> {
    let want = matches!(op, Op::Check);
    let element = &ctx.component.element;

    if ctx.driver.is_checked(element).await? == want {
        debug!("{} already {}", ctx.component.identity(), state(want));
    } else {
        ctx.driver.click(element, Click::left()).await?;
    }

    let now = ctx.driver.is_checked(element).await?;
    if now != want {
        return Err(Error::ValueMismatch {
            kind: ctx.component.kind.type_name().to_string(),
            actual: state(now).to_string(),
            expected: state(want).to_string(),
        });
    }
    Ok(())
}

fn state(checked: bool) -> &'static str {
    if checked {
        "checked"
    } else {
        "unchecked"
    }
}
