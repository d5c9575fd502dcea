//! Keystroke notation for keys-mode text entry.
//!
//! `{Enter}`, `{Tab 3}` and `~` (Enter) name special keys; `^`, `+` and `%`
//! hold Control, Shift and Alt for the next key or for a parenthesized
//! group. A literal modifier character is written in braces, e.g. `{+}`.

use crate::{Error, Result};

/// Characters that mark text as keystroke notation.
pub const SPECIAL_KEYS: [char; 8] = ['~', '+', '^', '%', '(', ')', '{', '}'];

/// Whether text contains keystroke notation. Such text cannot be compared
/// with the rendered field value after entry.
pub fn contains_special_keys(text: &str) -> bool {
    text.chars().any(|c| SPECIAL_KEYS.contains(&c))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// A named key, using DOM `KeyboardEvent.key` names (`Enter`, `ArrowUp`).
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: Key,
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyStroke {
    fn plain(key: Key) -> Self {
        Self {
            key,
            control: false,
            shift: false,
            alt: false,
        }
    }

    pub fn has_modifiers(&self) -> bool {
        self.control || self.shift || self.alt
    }
}

#[derive(Default, Clone, Copy)]
struct Mods {
    control: bool,
    shift: bool,
    alt: bool,
}

impl Mods {
    fn apply(self, key: Key) -> KeyStroke {
        KeyStroke {
            key,
            control: self.control,
            shift: self.shift,
            alt: self.alt,
        }
    }

    fn is_empty(self) -> bool {
        !(self.control || self.shift || self.alt)
    }
}

/// Parse keystroke notation into a sequence of strokes.
pub fn parse(text: &str) -> Result<Vec<KeyStroke>> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut pending = Mods::default();
    let mut group: Option<Mods> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '^' => pending.control = true,
            '+' => pending.shift = true,
            '%' => pending.alt = true,
            '(' => {
                if group.is_some() {
                    return Err(Error::InvalidParameter(format!(
                        "nested key group in '{}'",
                        text
                    )));
                }
                group = Some(pending);
                pending = Mods::default();
            }
            ')' => {
                if group.take().is_none() {
                    return Err(Error::InvalidParameter(format!(
                        "unbalanced ')' in '{}'",
                        text
                    )));
                }
            }
            '{' => {
                let close = chars[i..]
                    .iter()
                    // "{}}" names a literal '}'
                    .skip(1)
                    .position(|&c| c == '}')
                    .map(|p| i + p + 1)
                    .ok_or_else(|| {
                        Error::InvalidParameter(format!("unterminated '{{' in '{}'", text))
                    })?;
                let body: String = chars[i..close].iter().collect();
                i = close + 1;
                let (key, count) = parse_braced(&body, text)?;
                let mods = merge(group, pending);
                for _ in 0..count {
                    out.push(mods.apply(key.clone()));
                }
                pending = Mods::default();
            }
            '~' => {
                out.push(merge(group, pending).apply(Key::Named("Enter".into())));
                pending = Mods::default();
            }
            other => {
                out.push(merge(group, pending).apply(Key::Char(other)));
                pending = Mods::default();
            }
        }
    }

    if group.is_some() {
        return Err(Error::InvalidParameter(format!(
            "unbalanced '(' in '{}'",
            text
        )));
    }
    if !pending.is_empty() {
        // A trailing modifier with nothing to modify types itself.
        if pending.control {
            out.push(KeyStroke::plain(Key::Char('^')));
        }
        if pending.shift {
            out.push(KeyStroke::plain(Key::Char('+')));
        }
        if pending.alt {
            out.push(KeyStroke::plain(Key::Char('%')));
        }
    }
    Ok(out)
}

fn merge(group: Option<Mods>, pending: Mods) -> Mods {
    let g = group.unwrap_or_default();
    Mods {
        control: g.control || pending.control,
        shift: g.shift || pending.shift,
        alt: g.alt || pending.alt,
    }
}

fn parse_braced(body: &str, text: &str) -> Result<(Key, usize)> {
    let (name, count) = match body.rsplit_once(' ') {
        Some((name, n)) if !name.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
            let n = n.parse().map_err(|_| {
                Error::InvalidParameter(format!("bad repeat count in '{}'", text))
            })?;
            (name, n)
        }
        _ => (body, 1),
    };

    let mut it = name.chars();
    if let (Some(c), None) = (it.next(), it.next()) {
        return Ok((Key::Char(c), count));
    }

    let key = match name.to_ascii_uppercase().as_str() {
        "ENTER" => "Enter",
        "TAB" => "Tab",
        "ESC" | "ESCAPE" => "Escape",
        "BS" | "BKSP" | "BACKSPACE" => "Backspace",
        "DEL" | "DELETE" => "Delete",
        "INS" | "INSERT" => "Insert",
        "UP" => "ArrowUp",
        "DOWN" => "ArrowDown",
        "LEFT" => "ArrowLeft",
        "RIGHT" => "ArrowRight",
        "HOME" => "Home",
        "END" => "End",
        "PGUP" | "PAGEUP" => "PageUp",
        "PGDN" | "PAGEDOWN" => "PageDown",
        "SPACE" => " ",
        upper => {
            let is_fkey = upper.len() > 1
                && upper.starts_with('F')
                && upper[1..].parse::<u8>().is_ok_and(|n| (1..=12).contains(&n));
            if !is_fkey {
                return Err(Error::InvalidParameter(format!(
                    "unknown key '{{{}}}' in '{}'",
                    name, text
                )));
            }
            return Ok((Key::Named(upper.to_string()), count));
        }
    };
    let key = if key == " " {
        Key::Char(' ')
    } else {
        Key::Named(key.to_string())
    };
    Ok((key, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> KeyStroke {
        KeyStroke::plain(Key::Named(name.into()))
    }

    #[test]
    fn test_contains_special_keys() {
        assert!(contains_special_keys("abc{Enter}"));
        assert!(contains_special_keys("a+b"));
        assert!(contains_special_keys("~"));
        assert!(!contains_special_keys("plain text 123"));
    }

    #[test]
    fn test_parse_plain_and_named() {
        let keys = parse("ab{Enter}").unwrap();
        assert_eq!(
            keys,
            vec![
                KeyStroke::plain(Key::Char('a')),
                KeyStroke::plain(Key::Char('b')),
                named("Enter"),
            ]
        );
        assert_eq!(parse("~").unwrap(), vec![named("Enter")]);
        assert_eq!(parse("{Tab 3}").unwrap().len(), 3);
        assert_eq!(parse("{F5}").unwrap(), vec![named("F5")]);
    }

    #[test]
    fn test_parse_modifiers() {
        let keys = parse("^a").unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].control && !keys[0].shift);
        assert_eq!(keys[0].key, Key::Char('a'));

        let keys = parse("+(ab)c").unwrap();
        assert!(keys[0].shift && keys[1].shift);
        assert!(!keys[2].shift);
    }

    #[test]
    fn test_parse_literal_braces() {
        let keys = parse("{+}{}}{{}").unwrap();
        let chars: Vec<Key> = keys.into_iter().map(|k| k.key).collect();
        assert_eq!(chars, vec![Key::Char('+'), Key::Char('}'), Key::Char('{')]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("{Enter").is_err());
        assert!(parse("(ab").is_err());
        assert!(parse("ab)").is_err());
        assert!(parse("{Bogus}").is_err());
    }
}
