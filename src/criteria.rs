use crate::types::ElementType;
use std::fmt;

/// Reserved token splitting a compound "parent.child" reference.
pub const PARENT_CHILD_SEPARATOR: &str = "$SEPARATOR_WIN_COMP$";

/// What to search for in one step: scopes, declared type and match mode.
///
/// Built fresh per step and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionSpec {
    parent_scope: Option<String>,
    component_scope: String,
    declared_type: Option<String>,
    partial_match: bool,
}

impl CriterionSpec {
    /// Split `raw` on [`PARENT_CHILD_SEPARATOR`]. Malformed input degrades
    /// to a single component scope; this never fails.
    pub fn parse(raw: &str, declared_type: Option<&str>, partial_match: bool) -> Self {
        let (parent_scope, component_scope) = match raw.split_once(PARENT_CHILD_SEPARATOR) {
            Some((parent, component)) => (Some(parent.to_string()), component.to_string()),
            None => (None, raw.to_string()),
        };
        Self {
            parent_scope,
            component_scope,
            declared_type: declared_type.map(str::to_string),
            partial_match,
        }
    }

    pub fn parent_scope(&self) -> Option<&str> {
        self.parent_scope.as_deref()
    }

    pub fn component_scope(&self) -> &str {
        &self.component_scope
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn partial_match(&self) -> bool {
        self.partial_match
    }

    /// The component scope as display text, without one pair of
    /// surrounding double quotes.
    pub fn label_text(&self) -> &str {
        strip_quotes(self.component_scope.trim())
    }

    /// The structural pattern of the declared type, if it has one.
    pub fn element_type(&self) -> Option<&'static ElementType> {
        self.declared_type.as_deref().and_then(ElementType::for_name)
    }

    /// Structural cache key over the normalized fields.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            parent_scope: self.parent_scope.as_deref().map(|p| p.trim().to_string()),
            component_scope: self.component_scope.trim().to_string(),
            declared_type: self
                .declared_type
                .as_deref()
                .map(|t| t.trim().to_ascii_lowercase()),
            partial_match: self.partial_match,
        }
    }
}

impl fmt::Display for CriterionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref parent) = self.parent_scope {
            write!(f, "{}{}", parent, PARENT_CHILD_SEPARATOR)?;
        }
        f.write_str(&self.component_scope)?;
        if let Some(ref ty) = self.declared_type {
            write!(f, " [{}]", ty)?;
        }
        if self.partial_match {
            f.write_str(" (partial)")?;
        }
        Ok(())
    }
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

/// A [`CriterionSpec`] with scopes trimmed and the type name lower-cased.
/// Equal fingerprints find the same element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    parent_scope: Option<String>,
    component_scope: String,
    declared_type: Option<String>,
    partial_match: bool,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref parent) = self.parent_scope {
            write!(f, "{}{}", parent, PARENT_CHILD_SEPARATOR)?;
        }
        f.write_str(&self.component_scope)?;
        if let Some(ref ty) = self.declared_type {
            write!(f, " [{}]", ty)?;
        }
        if self.partial_match {
            f.write_str(" (partial)")?;
        }
        Ok(())
    }
}
