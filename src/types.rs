//! Structural patterns for declared element types.
//!
//! A declared type such as `EditBox` or `CheckBox` stands for a set of HTML
//! tags, `<input type=...>` values, ARIA roles and well-known widget CSS
//! classes. The label-anchor strategy uses the pattern both as an XPath
//! (descendants near the label) and as a predicate on a single element.

use crate::locator::xpath_literal;
use std::fmt;

/// A declared element type and the markup that counts as one.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ElementType {
    pub name: &'static str,
    /// Plain tag names.
    pub tags: &'static [&'static str],
    /// Accepted `type` values of `<input>`.
    pub input_types: &'static [&'static str],
    /// Whether an `<input>` without a `type` attribute counts.
    pub untyped_input: bool,
    pub roles: &'static [&'static str],
    /// Class tokens used by common widget toolkits.
    pub classes: &'static [&'static str],
}

pub static EDIT_BOX: ElementType = ElementType {
    name: "EditBox",
    tags: &["textarea"],
    input_types: &["email", "number", "password", "search", "tel", "text", "url"],
    untyped_input: true,
    roles: &["textbox", "searchbox"],
    classes: &["sapMInput", "sapMTextArea", "sapUiTf"],
};

pub static BUTTON: ElementType = ElementType {
    name: "Button",
    tags: &["button"],
    input_types: &["button", "reset", "submit"],
    untyped_input: false,
    roles: &["button"],
    classes: &["sapMBtn"],
};

pub static COMBO_BOX: ElementType = ElementType {
    name: "ComboBox",
    tags: &["select"],
    input_types: &[],
    untyped_input: false,
    roles: &["combobox"],
    classes: &["sapMComboBox"],
};

pub static CHECK_BOX: ElementType = ElementType {
    name: "CheckBox",
    tags: &[],
    input_types: &["checkbox"],
    untyped_input: false,
    roles: &["checkbox"],
    classes: &["sapMCb"],
};

pub static COLOR: ElementType = ElementType {
    name: "Color",
    tags: &[],
    input_types: &["color"],
    untyped_input: false,
    roles: &[],
    classes: &[],
};

pub static DATE_TIME: ElementType = ElementType {
    name: "DateTime",
    tags: &[],
    input_types: &["date", "datetime-local", "month", "time", "week"],
    untyped_input: false,
    roles: &[],
    classes: &["sapMDP"],
};

pub static FILE: ElementType = ElementType {
    name: "File",
    tags: &[],
    input_types: &["file"],
    untyped_input: false,
    roles: &[],
    classes: &[],
};

pub static RADIO: ElementType = ElementType {
    name: "Radio",
    tags: &[],
    input_types: &["radio"],
    untyped_input: false,
    roles: &["radio"],
    classes: &["sapMRbB"],
};

pub static RANGE: ElementType = ElementType {
    name: "Range",
    tags: &[],
    input_types: &["range"],
    untyped_input: false,
    roles: &["slider"],
    classes: &["sapMSlider"],
};

pub static IMAGE: ElementType = ElementType {
    name: "Image",
    tags: &["img", "image"],
    input_types: &["image"],
    untyped_input: false,
    roles: &["img"],
    classes: &["sapMImg"],
};

pub static LIST: ElementType = ElementType {
    name: "List",
    tags: &["ul", "ol"],
    input_types: &[],
    untyped_input: false,
    roles: &["listbox", "list"],
    classes: &["sapUiList", "sapMList"],
};

pub static TREE: ElementType = ElementType {
    name: "Tree",
    tags: &[],
    input_types: &[],
    untyped_input: false,
    roles: &["tree"],
    classes: &["sapUiTree"],
};

pub static TABLE: ElementType = ElementType {
    name: "Table",
    tags: &["table"],
    input_types: &[],
    untyped_input: false,
    roles: &["table", "grid"],
    classes: &["sapUiTable"],
};

/// Accepted names (upper-cased) for each type.
static ALIASES: &[(&str, &ElementType)] = &[
    ("EDITBOX", &EDIT_BOX),
    ("INPUTFIELD", &EDIT_BOX),
    ("TEXTBOX", &EDIT_BOX),
    ("TEXTAREA", &EDIT_BOX),
    ("BUTTON", &BUTTON),
    ("PUSHBUTTON", &BUTTON),
    ("COMBOBOX", &COMBO_BOX),
    ("SELECT", &COMBO_BOX),
    ("CHECKBOX", &CHECK_BOX),
    ("COLOR", &COLOR),
    ("DATETIME", &DATE_TIME),
    ("DATE", &DATE_TIME),
    ("FILE", &FILE),
    ("RADIO", &RADIO),
    ("RADIOBUTTON", &RADIO),
    ("RANGE", &RANGE),
    ("SLIDER", &RANGE),
    ("IMAGE", &IMAGE),
    ("LIST", &LIST),
    ("LISTVIEW", &LIST),
    ("LISTBOX", &LIST),
    ("TREE", &TREE),
    ("TREEVIEW", &TREE),
    ("TABLE", &TABLE),
];

/// The attributes of one element that type matching looks at.
#[derive(Debug, Clone, Default)]
pub struct ElementFacts {
    pub tag: String,
    pub input_type: Option<String>,
    pub role: Option<String>,
    pub class: Option<String>,
}

impl ElementType {
    /// Look a type up by name or alias. Generic names such as `Component`
    /// have no structural pattern and return `None`.
    pub fn for_name(name: &str) -> Option<&'static ElementType> {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, ty)| *ty)
    }

    /// Whether an element with these facts is of this type.
    /// Checked in order: role, input type, class token, tag.
    pub fn matches(&self, facts: &ElementFacts) -> bool {
        if let Some(role) = facts.role.as_deref() {
            if self.roles.iter().any(|r| r.eq_ignore_ascii_case(role.trim())) {
                return true;
            }
        }

        if facts.tag.eq_ignore_ascii_case("input") {
            match facts.input_type.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => {
                    if self.input_types.iter().any(|i| i.eq_ignore_ascii_case(t)) {
                        return true;
                    }
                }
                _ => {
                    if self.untyped_input {
                        return true;
                    }
                }
            }
        }

        if let Some(class) = facts.class.as_deref() {
            if class
                .split_whitespace()
                .any(|token| self.classes.contains(&token))
            {
                return true;
            }
        }

        self.tags.iter().any(|t| t.eq_ignore_ascii_case(&facts.tag))
    }

    /// XPath union selecting elements of this type, either document-wide
    /// (`//`) or below the context node (`.//`).
    pub fn to_xpath(&self, relative: bool) -> String {
        let p = if relative { ".//" } else { "//" };
        let mut parts: Vec<String> = self.tags.iter().map(|t| format!("{p}{t}")).collect();

        if !self.input_types.is_empty() || self.untyped_input {
            let mut conds: Vec<String> = self
                .input_types
                .iter()
                .map(|t| format!("@type={}", xpath_literal(t)))
                .collect();
            if self.untyped_input {
                conds.insert(0, "not(@type)".to_string());
            }
            parts.push(format!("{p}input[{}]", conds.join(" or ")));
        }

        for role in self.roles {
            parts.push(format!("{p}*[@role={}]", xpath_literal(role)));
        }
        for class in self.classes {
            parts.push(format!(
                "{p}*[contains(concat(' ',normalize-space(@class),' '),' {class} ')]"
            ));
        }
        parts.join(" | ")
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(tag: &str, input_type: Option<&str>, role: Option<&str>, class: Option<&str>) -> ElementFacts {
        ElementFacts {
            tag: tag.into(),
            input_type: input_type.map(Into::into),
            role: role.map(Into::into),
            class: class.map(Into::into),
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(ElementType::for_name("EditBox"), Some(&EDIT_BOX));
        assert_eq!(ElementType::for_name("textarea"), Some(&EDIT_BOX));
        assert_eq!(ElementType::for_name("Input Field"), Some(&EDIT_BOX));
        assert_eq!(ElementType::for_name("RadioButton"), Some(&RADIO));
        assert_eq!(ElementType::for_name("List"), Some(&LIST));
        assert!(ElementType::for_name("Component").is_none());
        assert!(ElementType::for_name("").is_none());
    }

    #[test]
    fn test_matches_checkbox() {
        assert!(CHECK_BOX.matches(&facts("input", Some("checkbox"), None, None)));
        assert!(CHECK_BOX.matches(&facts("INPUT", Some("CheckBox"), None, None)));
        assert!(CHECK_BOX.matches(&facts("div", None, Some("checkbox"), None)));
        assert!(CHECK_BOX.matches(&facts("div", None, None, Some("x sapMCb y"))));
        assert!(!CHECK_BOX.matches(&facts("input", Some("radio"), None, None)));
        assert!(!CHECK_BOX.matches(&facts("label", None, None, None)));
    }

    #[test]
    fn test_untyped_input_is_edit_box() {
        assert!(EDIT_BOX.matches(&facts("input", None, None, None)));
        assert!(!BUTTON.matches(&facts("input", None, None, None)));
        assert!(BUTTON.matches(&facts("input", Some("submit"), None, None)));
        assert!(BUTTON.matches(&facts("button", None, None, None)));
    }

    #[test]
    fn test_xpath_relative() {
        let xpath = COMBO_BOX.to_xpath(true);
        assert_eq!(
            xpath,
            ".//select | .//*[@role='combobox'] | .//*[contains(concat(' ',normalize-space(@class),' '),' sapMComboBox ')]"
        );
        let xpath = EDIT_BOX.to_xpath(false);
        assert!(xpath.starts_with("//textarea | //input[not(@type) or @type='email'"));
    }
}
