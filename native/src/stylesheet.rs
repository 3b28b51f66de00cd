//! Stylesheet model: selectors, rules and declaration lists.
//!
//! Only the four selector forms the cascade understands are recognized:
//! `tag`, `.class`, `.a.b` and `#id`. Anything else is skipped silently, as
//! are declarations without a `:`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::tree::Node;
use crate::types::NodeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Type(NodeType),
    Class(String),
    /// Node must carry every listed class.
    Classes(Vec<String>),
    Id(String),
}

impl Selector {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text.contains(char::is_whitespace) {
            return None;
        }

        if let Some(id) = text.strip_prefix('#') {
            if id.is_empty() || id.contains(['.', '#']) {
                return None;
            }
            return Some(Self::Id(id.to_string()));
        }

        if let Some(rest) = text.strip_prefix('.') {
            let names: Vec<String> = rest.split('.').map(str::to_string).collect();
            if names.iter().any(|n| n.is_empty() || n.contains('#')) {
                return None;
            }
            return Some(if names.len() == 1 {
                Self::Class(names.into_iter().next().unwrap_or_default())
            } else {
                Self::Classes(names)
            });
        }

        NodeType::from_name(text).map(Self::Type)
    }

    /// Cascade rank: type < class < multi-class < id.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Type(_) => 0,
            Self::Class(_) => 1,
            Self::Classes(_) => 2,
            Self::Id(_) => 3,
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Type(t) => node.node_type == *t,
            Self::Class(c) => node.has_class(c),
            Self::Classes(cs) => cs.iter().all(|c| node.has_class(c)),
            Self::Id(id) => !node.id.is_empty() && node.id == *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule programmatically. Returns `false` if the selector is not
    /// one of the supported forms.
    pub fn add_rule(&mut self, selector: &str, declarations: &str) -> bool {
        match Selector::parse(selector) {
            Some(selector) => {
                self.rules.push(Rule {
                    selector,
                    declarations: parse_declarations(declarations),
                });
                true
            }
            None => false,
        }
    }

    /// Parse `selector[, selector] { prop: value; }` blocks. Never fails;
    /// malformed pieces are dropped.
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut sheet = Self::new();
        let mut rest = css.as_ref();

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            let selectors = &rest[..open];
            let body = &rest[open + 1..close];
            let declarations = parse_declarations(body);

            for sel in selectors.split(',') {
                match Selector::parse(sel) {
                    Some(selector) => sheet.rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                    }),
                    None => tracing::trace!(selector = sel.trim(), "skipping unsupported selector"),
                }
            }
            rest = &rest[close + 1..];
        }

        sheet
    }

    /// Rules of one specificity rank, in source order.
    pub fn rules_at(&self, rank: u8) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |r| r.selector.specificity() == rank)
    }
}

fn strip_comments(css: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").ok()) {
        Some(re) if css.contains("/*") => re.replace_all(css, ""),
        _ => std::borrow::Cow::Borrowed(css),
    }
}

/// Parse `key: value; key2: value2`. Keys are lower-cased; empty keys or
/// values are dropped.
pub fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                return None;
            }
            Some((k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Inverse of [`parse_declarations`] for an inline style map.
pub fn format_declarations(styles: &BTreeMap<String, String>) -> String {
    styles
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_forms() {
        assert_eq!(Selector::parse("box"), Some(Selector::Type(NodeType::Box)));
        assert_eq!(Selector::parse(".warn"), Some(Selector::Class("warn".into())));
        assert_eq!(
            Selector::parse(".a.b"),
            Some(Selector::Classes(vec!["a".into(), "b".into()]))
        );
        assert_eq!(Selector::parse("#title"), Some(Selector::Id("title".into())));
        assert_eq!(Selector::parse("div"), None);
        assert_eq!(Selector::parse("box .a"), None);
        assert_eq!(Selector::parse(".a..b"), None);
    }

    #[test]
    fn test_specificity_order() {
        let ranks: Vec<u8> = ["text", ".a", ".a.b", "#x"]
            .iter()
            .filter_map(|s| Selector::parse(s))
            .map(|s| s.specificity())
            .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_matches() {
        let mut node = Node::new(NodeType::Text);
        node.id = "msg".into();
        node.classes = vec!["a".into(), "b".into()];

        assert!(Selector::parse("text").unwrap().matches(&node));
        assert!(Selector::parse(".a.b").unwrap().matches(&node));
        assert!(!Selector::parse(".a.c").unwrap().matches(&node));
        assert!(Selector::parse("#msg").unwrap().matches(&node));
        assert!(!Selector::parse("box").unwrap().matches(&node));
    }

    #[test]
    fn test_parse_stylesheet() {
        let css = r#"
            /* header */
            box { flex-direction: row; padding: 1 }
            .warn, #title { color: yellow; }
            div { color: red; }
            text { broken; color: blue }
        "#;
        let sheet = Stylesheet::parse(css);
        assert_eq!(sheet.rules.len(), 4);
        assert_eq!(sheet.rules[0].declarations.len(), 2);
        assert_eq!(sheet.rules[1].selector, Selector::Class("warn".into()));
        assert_eq!(sheet.rules[2].selector, Selector::Id("title".into()));
        assert_eq!(
            sheet.rules[3].declarations,
            vec![("color".to_string(), "blue".to_string())]
        );
        assert_eq!(sheet.rules_at(3).count(), 1);
    }

    #[test]
    fn test_parse_unterminated_block() {
        let sheet = Stylesheet::parse("box { color: red; } text { color: blue");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn test_declarations_round_trip_format() {
        let decls = parse_declarations("Color: red;  width : 50% ;;");
        assert_eq!(
            decls,
            vec![
                ("color".to_string(), "red".to_string()),
                ("width".to_string(), "50%".to_string())
            ]
        );
        let map: BTreeMap<String, String> = decls.into_iter().collect();
        assert_eq!(format_declarations(&map), "color: red; width: 50%");
    }
}
