use crate::error::{Error, Result};
use select::node::Node;
use select::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A structured CSS selector that can match nodes of a rendered page.
///
/// Config files write selectors as plain CSS strings; they are parsed into
/// this tree once at load time. Supported syntax is the subset marketplace
/// pages actually need: tags, `.class`, `#id`, `[attr]`, `[attr=value]`,
/// compound selectors, descendant (` `) and child (`>`) combinators and
/// comma-separated groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ElementSelector {
    Tag(String),
    Class(String),
    Id(String),
    Attribute { key: String, value: Option<String> },
    /// `div.card#main`: every part must match the same node
    And(Vec<ElementSelector>),
    /// `a, b`
    Or(Vec<ElementSelector>),
    Descendant {
        ancestor: Box<ElementSelector>,
        descendant: Box<ElementSelector>,
    },
    Child {
        parent: Box<ElementSelector>,
        child: Box<ElementSelector>,
    },
}

impl ElementSelector {
    pub fn class(name: &str) -> Self {
        ElementSelector::Class(name.to_string())
    }

    pub fn parse(input: &str) -> Result<Self> {
        let mut groups: Vec<ElementSelector> = input
            .split(',')
            .map(parse_chain)
            .collect::<Result<Vec<_>>>()?;

        if groups.len() == 1 {
            Ok(groups.remove(0))
        } else {
            Ok(ElementSelector::Or(groups))
        }
    }

    pub fn to_css_string(&self) -> String {
        match self {
            ElementSelector::Tag(tag) => tag.clone(),
            ElementSelector::Class(cls) => format!(".{}", cls),
            ElementSelector::Id(id) => format!("#{}", id),
            ElementSelector::Attribute { key, value } => match value {
                Some(v) => format!("[{}='{}']", key, v),
                None => format!("[{}]", key),
            },
            ElementSelector::And(parts) => parts.iter().map(|s| s.to_css_string()).collect(),
            ElementSelector::Or(groups) => groups
                .iter()
                .map(|s| s.to_css_string())
                .collect::<Vec<_>>()
                .join(", "),
            ElementSelector::Descendant {
                ancestor,
                descendant,
            } => format!(
                "{} {}",
                ancestor.to_css_string(),
                descendant.to_css_string()
            ),
            ElementSelector::Child { parent, child } => {
                format!("{} > {}", parent.to_css_string(), child.to_css_string())
            }
        }
    }
}

fn parse_chain(group: &str) -> Result<ElementSelector> {
    let spaced = group.replace('>', " > ");
    let mut tokens = spaced.split_whitespace();

    let first = tokens
        .next()
        .ok_or_else(|| Error::Selector(format!("empty selector in '{}'", group)))?;
    let mut current = parse_compound(first)?;
    let mut child_next = false;

    for token in tokens {
        if token == ">" {
            if child_next {
                return Err(Error::Selector(format!("dangling '>' in '{}'", group)));
            }
            child_next = true;
            continue;
        }
        let next = parse_compound(token)?;
        current = if child_next {
            ElementSelector::Child {
                parent: Box::new(current),
                child: Box::new(next),
            }
        } else {
            ElementSelector::Descendant {
                ancestor: Box::new(current),
                descendant: Box::new(next),
            }
        };
        child_next = false;
    }

    if child_next {
        return Err(Error::Selector(format!("dangling '>' in '{}'", group)));
    }
    Ok(current)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(rest: &str) -> (&str, &str) {
    let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    rest.split_at(end)
}

fn parse_compound(token: &str) -> Result<ElementSelector> {
    let mut parts = Vec::new();
    let mut rest = token;

    let (tag, after) = if rest.starts_with('*') {
        rest.split_at(1)
    } else {
        take_ident(rest)
    };
    if !tag.is_empty() {
        parts.push(ElementSelector::Tag(tag.to_string()));
    }
    rest = after;

    while let Some(marker) = rest.chars().next() {
        match marker {
            '.' | '#' => {
                let (name, after) = take_ident(&rest[1..]);
                if name.is_empty() {
                    return Err(Error::Selector(format!("missing name after '{}' in '{}'", marker, token)));
                }
                parts.push(if marker == '.' {
                    ElementSelector::Class(name.to_string())
                } else {
                    ElementSelector::Id(name.to_string())
                });
                rest = after;
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| Error::Selector(format!("unclosed '[' in '{}'", token)))?;
                let body = &rest[1..close];
                let attribute = match body.split_once('=') {
                    Some((key, value)) => ElementSelector::Attribute {
                        key: key.trim().to_string(),
                        value: Some(value.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string()),
                    },
                    None => ElementSelector::Attribute {
                        key: body.trim().to_string(),
                        value: None,
                    },
                };
                parts.push(attribute);
                rest = &rest[close + 1..];
            }
            other => {
                return Err(Error::Selector(format!("unexpected '{}' in '{}'", other, token)));
            }
        }
    }

    match parts.len() {
        0 => Err(Error::Selector(format!("empty compound selector '{}'", token))),
        1 => Ok(parts.remove(0)),
        _ => Ok(ElementSelector::And(parts)),
    }
}

impl FromStr for ElementSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ElementSelector {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ElementSelector> for String {
    fn from(selector: ElementSelector) -> Self {
        selector.to_css_string()
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_string())
    }
}

impl Predicate for ElementSelector {
    fn matches(&self, node: &Node) -> bool {
        match self {
            ElementSelector::Tag(tag) => match node.name() {
                Some(name) => tag == "*" || name == tag,
                None => false,
            },
            ElementSelector::Class(cls) => node
                .attr("class")
                .map(|classes| classes.split_whitespace().any(|c| c == cls))
                .unwrap_or(false),
            ElementSelector::Id(id) => node.attr("id") == Some(id.as_str()),
            ElementSelector::Attribute { key, value } => match value {
                Some(v) => node.attr(key.as_str()) == Some(v.as_str()),
                None => node.attr(key.as_str()).is_some(),
            },
            ElementSelector::And(parts) => parts.iter().all(|s| s.matches(node)),
            ElementSelector::Or(groups) => groups.iter().any(|s| s.matches(node)),
            ElementSelector::Descendant {
                ancestor,
                descendant,
            } => {
                if !descendant.matches(node) {
                    return false;
                }
                let mut current = node.parent();
                while let Some(parent) = current {
                    if ancestor.matches(&parent) {
                        return true;
                    }
                    current = parent.parent();
                }
                false
            }
            ElementSelector::Child { parent, child } => {
                child.matches(node) && node.parent().map(|p| parent.matches(&p)).unwrap_or(false)
            }
        }
    }
}

impl<'a> Predicate for &'a ElementSelector {
    fn matches(&self, node: &Node) -> bool {
        (*self).matches(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use select::document::Document;

    #[test]
    fn parses_compound_and_combinators() {
        let sel = ElementSelector::parse("div.card > span.name").unwrap();
        assert_eq!(
            sel,
            ElementSelector::Child {
                parent: Box::new(ElementSelector::And(vec![
                    ElementSelector::Tag("div".into()),
                    ElementSelector::Class("card".into()),
                ])),
                child: Box::new(ElementSelector::And(vec![
                    ElementSelector::Tag("span".into()),
                    ElementSelector::Class("name".into()),
                ])),
            }
        );
        assert_eq!(sel.to_css_string(), "div.card > span.name");
    }

    #[test]
    fn parses_attributes_and_groups() {
        let sel: ElementSelector = "[data-role='seller'], #owner".parse().unwrap();
        assert_eq!(
            sel,
            ElementSelector::Or(vec![
                ElementSelector::Attribute {
                    key: "data-role".into(),
                    value: Some("seller".into()),
                },
                ElementSelector::Id("owner".into()),
            ])
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(ElementSelector::parse("").is_err());
        assert!(ElementSelector::parse("div >").is_err());
        assert!(ElementSelector::parse("[unclosed").is_err());
        assert!(ElementSelector::parse("a..b").is_err());
    }

    #[test]
    fn deserializes_from_plain_string() {
        let sel: ElementSelector = serde_json::from_str("\".css-1sv7ku3\"").unwrap();
        assert_eq!(sel, ElementSelector::class("css-1sv7ku3"));
        assert_eq!(serde_json::to_string(&sel).unwrap(), "\".css-1sv7ku3\"");
    }

    #[test]
    fn matches_rendered_nodes() {
        let doc = Document::from(
            r#"<div class="row"><span class="name">alice</span></div>
               <section><span class="name">bob</span></section>"#,
        );
        let sel = ElementSelector::parse(".row .name").unwrap();
        let names: Vec<String> = doc.find(&sel).map(|n| n.text()).collect();
        assert_eq!(names, vec!["alice".to_string()]);
    }
}
