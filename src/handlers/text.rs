//! Verified text entry shared by edit boxes and combo boxes.

use super::ActionContext;
use crate::driver::Driver;
use crate::keys;
use crate::{Error, Result};
use tracing::debug;

/// How text reaches the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Entry {
    /// Literally, character by character.
    Characters,
    /// In keystroke notation.
    Keys,
}

/// Clear the field and enter `text`. When `verify` is set, compare the
/// field's value and re-enter up to `max_text_retries` more times before
/// failing with [`Error::ValueMismatch`].
pub(super) async fn set_text<D: Driver>(
    ctx: &ActionContext<'_, D>,
    text: &str,
    entry: Entry,
    verify: bool,
) -> Result<()> {
    let verify = if verify && entry == Entry::Keys && keys::contains_special_keys(text) {
        debug!("'{}' contains special keys, skipping verification", text);
        false
    } else {
        verify
    };

    enter(ctx, text, entry).await?;
    if !verify {
        return Ok(());
    }

    let element = &ctx.component.element;
    let mut actual = ctx.driver.value(element).await?;
    let mut retries = 0;
    while actual != text && retries < ctx.settings.max_text_retries {
        retries += 1;
        debug!("retry {} entering '{}' (got '{}')", retries, text, actual);
        enter(ctx, text, entry).await?;
        actual = ctx.driver.value(element).await?;
    }

    if actual != text {
        return Err(Error::ValueMismatch {
            kind: ctx.component.kind.type_name().to_string(),
            actual,
            expected: text.to_string(),
        });
    }
    Ok(())
}

async fn enter<D: Driver>(ctx: &ActionContext<'_, D>, text: &str, entry: Entry) -> Result<()> {
    let element = &ctx.component.element;
    ctx.driver.clear(element).await?;
    match entry {
        Entry::Characters => ctx.driver.type_chars(element, text).await,
        Entry::Keys => ctx.driver.type_keys(element, text).await,
    }
}
