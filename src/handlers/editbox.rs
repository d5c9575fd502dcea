use super::text::{set_text, Entry};
use super::{required, ActionContext};
use crate::driver::Driver;
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub(super) struct Op {
    entry: Entry,
    verify: bool,
}

const fn op(entry: Entry, verify: bool) -> Op {
    Op { entry, verify }
}

pub(super) const ACTIONS: &[(&str, Op)] = &[
    ("type", op(Entry::Characters, false)),
    ("typechars", op(Entry::Characters, false)),
    ("SetUnverifiedTextCharacters", op(Entry::Characters, false)),
    ("typekeys", op(Entry::Keys, false)),
    ("SetUnverifiedTextValue", op(Entry::Keys, false)),
    ("SetTextCharacters", op(Entry::Characters, true)),
    ("SetTextValue", op(Entry::Keys, true)),
];

pub(super) async fn perform<D: Driver>(
    ctx: &mut ActionContext<'_, D>,
    op: Op,
    action: &str,
    params: &[String],
) -> Result<()> {
    let text = required(params, 0, action)?;
    set_text(ctx, text, op.entry, op.verify).await
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run, run_with};
    use super::super::ComponentKind;
    use crate::mock::MockDom;
    use crate::settings::Settings;
    use crate::Error;
    use std::collections::HashMap;

    fn page() -> (crate::mock::MockDriver, usize) {
        let mut dom = MockDom::new();
        let body = dom.body(0);
        let input = dom.add(body, "input", &[("type", "text"), ("value", "old")], "");
        (dom.into_driver(), input)
    }

    #[tokio::test]
    async fn test_set_text_value_replaces_content() {
        let (driver, input) = page();
        run(&driver, ComponentKind::EditBox, input, "SetTextValue", &["hello"])
            .await
            .unwrap();
        assert_eq!(driver.node(input).value, "hello");
        assert_eq!(driver.inputs(), 1);
    }

    #[tokio::test]
    async fn test_keystrokes_are_interpreted() {
        let (driver, input) = page();
        run(&driver, ComponentKind::EditBox, input, "typekeys", &["abc{BACKSPACE}"])
            .await
            .unwrap();
        assert_eq!(driver.node(input).value, "ab");

        run(&driver, ComponentKind::EditBox, input, "typechars", &["a{b}"])
            .await
            .unwrap();
        assert_eq!(driver.node(input).value, "a{b}");
    }

    #[tokio::test]
    async fn test_retry_bound() {
        let (driver, input) = page();
        driver.stick_value("wrong");

        let err = run(&driver, ComponentKind::EditBox, input, "SetTextCharacters", &["right"])
            .await
            .unwrap_err();
        assert_eq!(driver.inputs(), 6);
        assert_eq!(
            err.to_string(),
            "EditBox value 'wrong' does not match expected value 'right'"
        );
    }

    #[tokio::test]
    async fn test_retry_bound_follows_settings() {
        let (driver, input) = page();
        driver.stick_value("wrong");
        let settings = Settings {
            max_text_retries: 2,
            ..Settings::default()
        };
        let mut variables = HashMap::new();

        let err = run_with(
            &driver,
            &settings,
            &mut variables,
            ComponentKind::EditBox,
            input,
            "SetTextValue",
            &["right"],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ValueMismatch { .. }));
        assert_eq!(driver.inputs(), 3);
    }

    #[tokio::test]
    async fn test_special_keys_skip_verification() {
        let (driver, input) = page();
        driver.stick_value("wrong");

        run(&driver, ComponentKind::EditBox, input, "SetTextValue", &["right~"])
            .await
            .unwrap();
        assert_eq!(driver.inputs(), 1);
    }

    #[tokio::test]
    async fn test_unverified_never_retries() {
        let (driver, input) = page();
        driver.stick_value("wrong");

        run(&driver, ComponentKind::EditBox, input, "type", &["right"])
            .await
            .unwrap();
        assert_eq!(driver.inputs(), 1);
    }

    #[tokio::test]
    async fn test_missing_text_parameter() {
        let (driver, input) = page();
        let err = run(&driver, ComponentKind::EditBox, input, "SetTextValue", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
