//! Locators and recognition strings.
//!
//! [`Locator`] is the query vocabulary shared with drivers. Every variant can
//! be rendered as XPath except `Css`, so a driver only has to evaluate XPath
//! and CSS. [`Recognition`] parses tagged recognition strings such as
//! `FRAMEID=pay;\;id=card;\;Tag=input;Index=2`.

use crate::frames::{FramePath, FrameSelector};
use crate::types::ElementType;
use std::fmt;

/// Separates frame and element segments of a recognition string.
pub const SEGMENT_SEPARATOR: &str = ";\\;";

/// How display text is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatch {
    /// One of the element's own text nodes equals the text.
    Own,
    /// The element's full string value equals the text.
    Full,
    /// One of the element's own text nodes contains the text, ignoring case.
    Contains,
}

/// A single element query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Evaluated as written, relative expressions against the scope element.
    XPath(String),
    Css(String),
    Id(String),
    Name(String),
    /// Exact class token.
    Class(String),
    /// Substring of the `class` attribute.
    ClassContains(String),
    Title(String),
    Tag(String),
    LinkText(String),
    PartialLinkText(String),
    Property { name: String, value: String },
    Text { text: String, mode: TextMatch },
    /// Text fields carrying the text as placeholder or value.
    Placeholder(String),
    OfType(&'static ElementType),
    /// The scope element's parent.
    Parent,
}

impl Locator {
    /// Render as XPath. `relative` selects descendants of the scope element
    /// instead of the whole document. Returns `None` for CSS.
    pub fn to_xpath(&self, relative: bool) -> Option<String> {
        let p = if relative { ".//" } else { "//" };
        let xpath = match self {
            Self::XPath(x) => x.clone(),
            Self::Css(_) => return None,
            Self::Id(v) => format!("{p}*[@id={}]", xpath_literal(v)),
            Self::Name(v) => format!("{p}*[@name={}]", xpath_literal(v)),
            Self::Class(v) => format!(
                "{p}*[contains(concat(' ',normalize-space(@class),' '),{})]",
                xpath_literal(&format!(" {} ", v.trim()))
            ),
            Self::ClassContains(v) => format!("{p}*[contains(@class,{})]", xpath_literal(v)),
            Self::Title(v) => format!("{p}*[@title={}]", xpath_literal(v)),
            Self::Tag(v) => format!("{p}{}", v.trim().to_ascii_lowercase()),
            Self::LinkText(v) => format!("{p}a[normalize-space(.)={}]", xpath_literal(v.trim())),
            Self::PartialLinkText(v) => format!("{p}a[contains(.,{})]", xpath_literal(v)),
            Self::Property { name, value } => {
                format!("{p}*[@{}={}]", name.trim(), xpath_literal(value))
            }
            Self::Text { text, mode } => match mode {
                TextMatch::Own => format!("{p}*[text()={}]", xpath_literal(text)),
                TextMatch::Full => format!("{p}*[.={}]", xpath_literal(text)),
                TextMatch::Contains => format!(
                    "{p}*[text()[contains(translate(.,'{UPPER}','{LOWER}'),{})]]",
                    xpath_literal(&text.to_lowercase())
                ),
            },
            Self::Placeholder(v) => {
                let lit = xpath_literal(v);
                [
                    format!("{p}input[@placeholder={lit}]"),
                    format!("{p}textarea[@placeholder={lit}]"),
                    format!("{p}*[@aria-placeholder={lit}]"),
                    format!("{p}textarea[.={lit}]"),
                    format!("{p}input[@value={lit}]"),
                ]
                .join(" | ")
            }
            Self::OfType(ty) => ty.to_xpath(relative),
            Self::Parent => "..".to_string(),
        };
        Some(xpath)
    }
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(x) => write!(f, "xpath={x}"),
            Self::Css(c) => write!(f, "css={c}"),
            Self::Id(v) => write!(f, "id={v}"),
            Self::Name(v) => write!(f, "name={v}"),
            Self::Class(v) => write!(f, "class={v}"),
            Self::ClassContains(v) => write!(f, "classcontains={v}"),
            Self::Title(v) => write!(f, "title={v}"),
            Self::Tag(v) => write!(f, "tag={v}"),
            Self::LinkText(v) => write!(f, "link={v}"),
            Self::PartialLinkText(v) => write!(f, "partiallink={v}"),
            Self::Property { name, value } => write!(f, "property={name}:{value}"),
            Self::Text { text, mode } => write!(f, "text({mode:?})={text}"),
            Self::Placeholder(v) => write!(f, "placeholder={v}"),
            Self::OfType(ty) => write!(f, "type={ty}"),
            Self::Parent => f.write_str(".."),
        }
    }
}

/// Quote a string as an XPath 1.0 literal, using `concat()` when it holds
/// both quote characters.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(",\"'\","))
    }
}

/// One element segment: every locator must match; `index` (1-based) picks
/// one of the matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub locators: Vec<Locator>,
    pub index: Option<usize>,
}

/// A parsed recognition string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Recognition {
    /// Frame path from the top document. Empty when none was given.
    pub frames: FramePath,
    /// Ancestor chain; each segment is searched inside the previous match.
    pub segments: Vec<Segment>,
}

impl Recognition {
    /// Parse a structured locator. Returns `None` for anything that should be
    /// treated as display text instead.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if is_raw_xpath(text) {
            return Some(Self {
                frames: FramePath::top(),
                segments: vec![Segment {
                    locators: vec![Locator::XPath(text.to_string())],
                    index: None,
                }],
            });
        }

        let mut rec = Self::default();
        for raw in text.split(SEGMENT_SEPARATOR) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (key, value) = raw.split_once('=')?;
            let key = key.trim().to_ascii_uppercase();

            // XPath and CSS swallow the rest of the segment, ';' included.
            match key.as_str() {
                "XPATH" => {
                    rec.segments.push(single(Locator::XPath(value.trim().to_string())));
                    continue;
                }
                "CSS" => {
                    rec.segments.push(single(Locator::Css(value.trim().to_string())));
                    continue;
                }
                _ => {}
            }

            let mut segment = Segment {
                locators: Vec::new(),
                index: None,
            };
            for qualifier in raw.split(';') {
                let qualifier = qualifier.trim();
                if qualifier.is_empty() {
                    continue;
                }
                let (key, value) = qualifier.split_once('=')?;
                match parse_qualifier(&key.trim().to_ascii_uppercase(), value)? {
                    Qualifier::Frame(selector) => {
                        // Frames must precede every element segment.
                        if !rec.segments.is_empty() || !segment.locators.is_empty() {
                            return None;
                        }
                        rec.frames.push(selector);
                    }
                    Qualifier::Element(locator) => segment.locators.push(locator),
                    Qualifier::Index(i) => segment.index = Some(i),
                }
            }
            if !segment.locators.is_empty() {
                rec.segments.push(segment);
            } else if segment.index.is_some() {
                return None;
            }
        }

        if rec.frames.is_top() && rec.segments.is_empty() {
            None
        } else {
            Some(rec)
        }
    }

    /// Whether the string names a frame.
    pub fn has_frames(&self) -> bool {
        !self.frames.is_top()
    }
}

impl fmt::Display for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.frames.iter().map(|s| s.to_string()).collect();
        for seg in &self.segments {
            let mut quals: Vec<String> = seg.locators.iter().map(|l| l.to_string()).collect();
            if let Some(i) = seg.index {
                quals.push(format!("index={i}"));
            }
            parts.push(quals.join(";"));
        }
        f.write_str(&parts.join(SEGMENT_SEPARATOR))
    }
}

fn single(locator: Locator) -> Segment {
    Segment {
        locators: vec![locator],
        index: None,
    }
}

fn is_raw_xpath(text: &str) -> bool {
    text.starts_with('/') || text.starts_with("./") || text.starts_with('(')
}

enum Qualifier {
    Frame(FrameSelector),
    Element(Locator),
    Index(usize),
}

fn parse_qualifier(key: &str, value: &str) -> Option<Qualifier> {
    let v = value.trim().to_string();
    let q = match key {
        "FRAMEINDEX" => {
            let i: usize = value.trim().parse().ok()?;
            Qualifier::Frame(FrameSelector::Index(i.checked_sub(1)?))
        }
        "FRAMEID" | "IFRAMEID" => Qualifier::Frame(FrameSelector::Id(v)),
        "FRAMENAME" => Qualifier::Frame(FrameSelector::Name(v)),
        "FRAMEXPATH" => Qualifier::Frame(FrameSelector::XPath(v)),
        "ID" => Qualifier::Element(Locator::Id(v)),
        "NAME" => Qualifier::Element(Locator::Name(v)),
        "TEXT" => Qualifier::Element(Locator::Text {
            text: v,
            mode: TextMatch::Full,
        }),
        "CLASS" => Qualifier::Element(Locator::Class(v)),
        "CLASSCONTAINS" => Qualifier::Element(Locator::ClassContains(v)),
        "TITLE" => Qualifier::Element(Locator::Title(v)),
        "LINK" => Qualifier::Element(Locator::LinkText(v)),
        "PARTIALLINK" => Qualifier::Element(Locator::PartialLinkText(v)),
        "TAG" => Qualifier::Element(Locator::Tag(v)),
        "TYPE" => Qualifier::Element(Locator::OfType(ElementType::for_name(value)?)),
        "PROPERTY" => {
            let (name, value) = value.split_once(':')?;
            Qualifier::Element(Locator::Property {
                name: name.trim().to_string(),
                value: value.to_string(),
            })
        }
        "INDEX" => Qualifier::Index(value.trim().parse().ok().filter(|i| *i > 0)?),
        _ => return None,
    };
    Some(q)
}
