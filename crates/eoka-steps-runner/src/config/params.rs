use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Values for `${name}` references, usually from `-P key=value`.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key=value` arguments. Only the first `=` splits.
    pub fn from_args(args: &[String]) -> Result<Self> {
        args.iter().try_fold(Self::new(), |params, arg| {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Config(format!("invalid param '{}', empty key", arg)));
            }
            Ok(params.set(key, value))
        })
    }
}

/// A declared step-file parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub required: bool,
    pub default: Option<String>,
    pub description: Option<String>,
}

fn reference() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.-]*)\}").ok())
        .as_ref()
}

/// Replace `${name}` references in `template`.
///
/// Supplied values win over declared defaults. A declared parameter with no
/// value and no default expands to nothing, or fails when required.
/// Undeclared, unsupplied references are left as written.
pub fn substitute(template: &str, params: &Params, defs: &HashMap<String, ParamDef>) -> Result<String> {
    let Some(re) = reference() else {
        return Ok(template.to_string());
    };
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        let name = name.as_str();
        match (params.get(name), defs.get(name)) {
            (Some(value), _) => out.push_str(value),
            (None, Some(def)) => match def.default {
                Some(ref default) => out.push_str(default),
                None if def.required => {
                    return Err(Error::Config(format!("missing required parameter: {}", name)));
                }
                None => {}
            },
            (None, None) => out.push_str(whole.as_str()),
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Substitute every string scalar of a YAML document in place.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => *s = substitute(s, params, defs)?,
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => substitute_value(&mut tagged.value, params, defs)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(required: bool, default: Option<&str>) -> ParamDef {
        ParamDef {
            required,
            default: default.map(Into::into),
            description: None,
        }
    }

    #[test]
    fn test_substitute_supplied_and_default() {
        let params = Params::new().set("user", "alice");
        let mut defs = HashMap::new();
        defs.insert("country".to_string(), def(false, Some("Norway")));

        let out = substitute("${user} from ${country}", &params, &defs).unwrap();
        assert_eq!(out, "alice from Norway");
    }

    #[test]
    fn test_supplied_value_is_not_rescanned() {
        let params = Params::new().set("a", "${b}").set("b", "x");
        let out = substitute("[${a}]", &params, &HashMap::new()).unwrap();
        assert_eq!(out, "[${b}]");
    }

    #[test]
    fn test_unknown_and_optional_references() {
        let mut defs = HashMap::new();
        defs.insert("opt".to_string(), def(false, None));

        let out = substitute("${opt}|${HOME}|$x{", &Params::new(), &defs).unwrap();
        assert_eq!(out, "|${HOME}|$x{");
    }

    #[test]
    fn test_required_missing() {
        let mut defs = HashMap::new();
        defs.insert("user".to_string(), def(true, None));

        let err = substitute("${user}", &Params::new(), &defs).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: user"));
    }

    #[test]
    fn test_params_from_args() {
        let args = vec!["user=alice".to_string(), "query=a=b".to_string()];
        let params = Params::from_args(&args).unwrap();
        assert_eq!(params.get("user"), Some("alice"));
        assert_eq!(params.get("query"), Some("a=b"));

        assert!(Params::from_args(&["novalue".to_string()]).is_err());
        assert!(Params::from_args(&["=x".to_string()]).is_err());
    }
}
