use super::text::{set_text, Entry};
use super::{parse_index, required, write_items, ActionContext};
use crate::driver::{Click, Driver, Item};
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub(super) enum Op {
    HideList,
    ShowList,
    Select { partial: bool, verify: bool },
    SelectIndex,
    VerifySelected,
    CaptureItemsToFile,
    SetText { verify: bool },
}

pub(super) const ACTIONS: &[(&str, Op)] = &[
    ("HideList", Op::HideList),
    ("ShowList", Op::ShowList),
    ("Select", Op::Select { partial: false, verify: true }),
    ("SelectIndex", Op::SelectIndex),
    ("SelectPartialMatch", Op::Select { partial: true, verify: true }),
    ("SelectUnverified", Op::Select { partial: false, verify: false }),
    ("SelectUnverifiedPartialMatch", Op::Select { partial: true, verify: false }),
    ("VerifySelected", Op::VerifySelected),
    ("CaptureItemsToFile", Op::CaptureItemsToFile),
    ("SetTextValue", Op::SetText { verify: true }),
    ("SetUnverifiedTextValue", Op::SetText { verify: false }),
];

pub(super) async fn perform<D: Driver>(
    ctx: &mut ActionContext<'_, D>,
    op: Op,
    action: &str,
    params: &[String],
) -> Result<()> {
    let element = &ctx.component.element;
    match op {
        Op::HideList => ctx.driver.set_list_visible(element, false).await,
        Op::ShowList => ctx.driver.set_list_visible(element, true).await,
        Op::Select { partial, verify } => {
            let text = required(params, 0, action)?;
            let items = ctx.driver.items(element).await?;
            let index = items
                .iter()
                .position(|item| item_matches(item, text, partial))
                .ok_or_else(|| {
                    Error::Verification(format!("'{}' is not an item of the {}", text, ctx.component.kind))
                })?;
            select_index(ctx, index, verify).await
        }
        Op::SelectIndex => {
            let index = parse_index(required(params, 0, action)?)?;
            select_index(ctx, index - 1, true).await
        }
        Op::VerifySelected => {
            let expected = required(params, 0, action)?;
            let items = ctx.driver.items(element).await?;
            let actual = selected_text(&items);
            if actual != expected {
                return Err(Error::ValueMismatch {
                    kind: ctx.component.kind.type_name().to_string(),
                    actual: actual.to_string(),
                    expected: expected.to_string(),
                });
            }
            Ok(())
        }
        Op::CaptureItemsToFile => {
            let file = required(params, 0, action)?;
            let items: Vec<String> = ctx
                .driver
                .items(element)
                .await?
                .into_iter()
                .map(|i| i.text)
                .collect();
            write_items(ctx.settings, file, params.get(1).map(String::as_str), &items)
        }
        Op::SetText { verify } => {
            let text = required(params, 0, action)?;
            set_text(ctx, text, Entry::Keys, verify).await
        }
    }
}

/// Choose the entry at `index` (0-based), then check it became selected.
async fn select_index<D: Driver>(ctx: &ActionContext<'_, D>, index: usize, verify: bool) -> Result<()> {
    let element = &ctx.component.element;
    let items = ctx.driver.items(element).await?;
    let Some(target) = items.get(index) else {
        return Err(Error::InvalidParameter(format!(
            "index {} is out of range, the {} has {} items",
            index + 1,
            ctx.component.kind,
            items.len()
        )));
    };
    debug!("selecting '{}' in {}", target.text, ctx.component.identity());
    ctx.driver.choose_item(element, index, Click::left()).await?;

    if verify {
        let after = ctx.driver.items(element).await?;
        if !after.get(index).is_some_and(|i| i.selected) {
            return Err(Error::ValueMismatch {
                kind: ctx.component.kind.type_name().to_string(),
                actual: selected_text(&after).to_string(),
                expected: target.text.clone(),
            });
        }
    }
    Ok(())
}

fn item_matches(item: &Item, text: &str, partial: bool) -> bool {
    if partial {
        item.text.to_lowercase().contains(&text.to_lowercase())
    } else {
        item.text == text
    }
}

fn selected_text(items: &[Item]) -> &str {
    items
        .iter()
        .find(|i| i.selected)
        .map(|i| i.text.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run, run_with};
    use super::super::ComponentKind;
    use crate::mock::{MockDom, MockDriver};
    use crate::settings::Settings;
    use crate::Error;
    use std::collections::HashMap;

    fn countries() -> (MockDriver, usize, Vec<usize>) {
        let mut dom = MockDom::new();
        let body = dom.body(0);
        let select = dom.add(body, "select", &[("id", "country")], "");
        let options = ["Denmark", "Norway", "Sweden"]
            .iter()
            .map(|c| dom.add(select, "option", &[], c))
            .collect();
        (dom.into_driver(), select, options)
    }

    #[tokio::test]
    async fn test_select_by_text() {
        let (driver, select, options) = countries();
        run(&driver, ComponentKind::ComboBox, select, "Select", &["Norway"])
            .await
            .unwrap();
        assert!(driver.node(options[1]).selected);
        run(&driver, ComponentKind::ComboBox, select, "VerifySelected", &["Norway"])
            .await
            .unwrap();

        let err = run(&driver, ComponentKind::ComboBox, select, "VerifySelected", &["Sweden"])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ComboBox value 'Norway' does not match expected value 'Sweden'"
        );
    }

    #[tokio::test]
    async fn test_select_partial_and_missing() {
        let (driver, select, options) = countries();
        run(&driver, ComponentKind::ComboBox, select, "SelectPartialMatch", &["swe"])
            .await
            .unwrap();
        assert!(driver.node(options[2]).selected);

        let err = run(&driver, ComponentKind::ComboBox, select, "Select", &["swe"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Verification(_)));
    }

    #[tokio::test]
    async fn test_select_index_is_one_based() {
        let (driver, select, options) = countries();
        run(&driver, ComponentKind::ComboBox, select, "SelectIndex", &["1"])
            .await
            .unwrap();
        assert!(driver.node(options[0]).selected);

        for bad in ["0", "-1", "4"] {
            let err = run(&driver, ComponentKind::ComboBox, select, "SelectIndex", &[bad])
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_show_and_hide_list() {
        let (driver, select, _) = countries();
        run(&driver, ComponentKind::ComboBox, select, "ShowList", &[]).await.unwrap();
        assert_eq!(driver.list_visible(), Some(true));
        run(&driver, ComponentKind::ComboBox, select, "hidelist", &[]).await.unwrap();
        assert_eq!(driver.list_visible(), Some(false));
    }

    #[tokio::test]
    async fn test_capture_items_to_file() {
        let (driver, select, _) = countries();
        let dir = std::env::temp_dir().join(format!("eoka-steps-combo-{}", std::process::id()));
        let settings = Settings {
            output_dir: Some(dir.clone()),
            ..Settings::default()
        };
        let mut variables = HashMap::new();

        run_with(
            &driver,
            &settings,
            &mut variables,
            ComponentKind::ComboBox,
            select,
            "CaptureItemsToFile",
            &["items.txt", "UTF-16"],
        )
        .await
        .unwrap();

        let content = std::fs::read_to_string(dir.join("items.txt")).unwrap();
        assert_eq!(content, "Denmark\nNorway\nSweden\n");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_not_a_combo_box_action() {
        let (driver, select, _) = countries();
        let err = run(&driver, ComponentKind::ComboBox, select, "Click", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown action 'Click' for ComboBox.");
    }
}
