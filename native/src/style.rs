//! Style Module — Cascade resolution into `ComputedStyle`.
//!
//! Responsibilities:
//! - Property parsing (`apply_property`), shorthand expansion, silent degradation
//! - Selector cascade: type → class → multi-class → ID → inline `style` attribute
//! - Paint-time inheritance of color, text-align and text attributes

use crate::stylesheet::{parse_declarations, Stylesheet};
use crate::tree::{Node, NodeHandle, NodeTree};
use crate::types::{
    parse_color, BorderStyle, CellAttrs, ComputedStyle, Dimension, Display, Edges,
    FlexDirection, Position, StyleMask, TextAlign,
};

/// Highest selector rank; the inline `style` attribute applies after it.
const MAX_RANK: u8 = 3;

/// Apply one declaration. Returns whether the key was recognized; unknown
/// keys leave the style untouched.
pub fn apply_property(style: &mut ComputedStyle, key: &str, value: &str) -> bool {
    let value = value.trim();
    match key {
        "width" => style.width = parse_dimension(value),
        "height" => style.height = parse_dimension(value),
        "display" => {
            style.display = if value == "none" {
                Display::None
            } else {
                Display::Block
            }
        }
        "flex-direction" => match value {
            "row" | "row-reverse" => style.flex_direction = FlexDirection::Row,
            "column" | "column-reverse" => style.flex_direction = FlexDirection::Column,
            _ => {}
        },
        "flex" | "flex-grow" => {
            let first = value.split_whitespace().next().unwrap_or("");
            style.flex = first.parse::<f32>().unwrap_or(0.0).max(0.0);
        }
        "position" => match value {
            "absolute" => style.position = Position::Absolute,
            "static" | "relative" => style.position = Position::Static,
            _ => {}
        },
        "top" => style.top = parse_offset(value),
        "right" => style.right = parse_offset(value),
        "bottom" => style.bottom = parse_offset(value),
        "left" => style.left = parse_offset(value),
        "padding" => apply_shorthand(&mut style.padding, value),
        "margin" => apply_shorthand(&mut style.margin, value),
        "padding-top" => style.padding.top = parse_cells(value),
        "padding-right" => style.padding.right = parse_cells(value),
        "padding-bottom" => style.padding.bottom = parse_cells(value),
        "padding-left" => style.padding.left = parse_cells(value),
        "margin-top" => style.margin.top = parse_cells(value),
        "margin-right" => style.margin.right = parse_cells(value),
        "margin-bottom" => style.margin.bottom = parse_cells(value),
        "margin-left" => style.margin.left = parse_cells(value),
        "color" => {
            if value == "inherit" {
                style.explicit.remove(StyleMask::COLOR);
            } else if let Some(c) = parse_color(value) {
                style.color = c;
                style.explicit |= StyleMask::COLOR;
            }
        }
        "background" | "background-color" => {
            if let Some(c) = parse_color(value) {
                style.background = c;
            }
        }
        "border" => {
            style.border = value != "none";
            if let Some(bs) = value.split_whitespace().find_map(BorderStyle::from_name) {
                style.border_style = bs;
            }
        }
        "border-style" => match value {
            "none" => style.border = false,
            other => {
                if let Some(bs) = BorderStyle::from_name(other) {
                    style.border_style = bs;
                }
            }
        },
        "text-align" => {
            let align = match value {
                "left" => Some(TextAlign::Left),
                "center" => Some(TextAlign::Center),
                "right" => Some(TextAlign::Right),
                _ => None,
            };
            if let Some(a) = align {
                style.text_align = a;
                style.explicit |= StyleMask::TEXT_ALIGN;
            }
        }
        "font-weight" => {
            let bold = value == "bold" || value.parse::<u32>().is_ok_and(|w| w >= 600);
            style.attrs.set(CellAttrs::BOLD, bold);
            style.explicit |= StyleMask::ATTRS;
        }
        "font-style" => {
            style.attrs.set(CellAttrs::ITALIC, value == "italic");
            style.explicit |= StyleMask::ATTRS;
        }
        "text-decoration" => {
            style.attrs.set(CellAttrs::UNDERLINE, value.contains("underline"));
            style.explicit |= StyleMask::ATTRS;
        }
        _ => return false,
    }
    true
}

/// `N` / `Npx` cells, `N%`, or `auto`. Anything else is `auto`.
pub fn parse_dimension(value: &str) -> Dimension {
    let v = value.trim();
    if let Some(p) = v.strip_suffix('%') {
        return p
            .trim()
            .parse::<f32>()
            .map(|p| Dimension::Percent(p.max(0.0).min(MAX_CELLS as f32)))
            .unwrap_or(Dimension::Auto);
    }
    match parse_number(v) {
        Some(n) => Dimension::Cells(n.max(0)),
        None => Dimension::Auto,
    }
}

/// Largest cell count a declaration can carry, in either direction.
const MAX_CELLS: i32 = u16::MAX as i32;

fn parse_number(value: &str) -> Option<i32> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    v.parse::<i64>()
        .ok()
        .map(|n| n.clamp(-i64::from(MAX_CELLS), i64::from(MAX_CELLS)) as i32)
        .or_else(|| {
            v.parse::<f32>()
                .ok()
                .filter(|f| !f.is_nan())
                .map(|f| f.floor().clamp(-(MAX_CELLS as f32), MAX_CELLS as f32) as i32)
        })
}

/// Integer cell count; unparsable values degrade to 0.
fn parse_cells(value: &str) -> i32 {
    parse_number(value).unwrap_or(0)
}

fn parse_offset(value: &str) -> Option<i32> {
    if value == "auto" {
        None
    } else {
        Some(parse_cells(value))
    }
}

/// 1 value → all sides; 2 → vertical, horizontal; 4 → top, right, bottom,
/// left. Other counts leave the edges untouched.
fn apply_shorthand(edges: &mut Edges, value: &str) {
    let parts: Vec<i32> = value.split_whitespace().map(parse_cells).collect();
    match parts.as_slice() {
        [all] => *edges = Edges::all(*all),
        [v, h] => {
            *edges = Edges {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            }
        }
        [top, right, bottom, left] => {
            *edges = Edges {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }
        }
        _ => {}
    }
}

/// Compute the style for one node: explicit defaults, then every matching
/// rule rank by rank (source order within a rank), then the inline `style`
/// attribute.
pub fn compute_style(node: &Node, sheet: &Stylesheet) -> ComputedStyle {
    let mut style = ComputedStyle::default();
    for rank in 0..=MAX_RANK {
        for rule in sheet.rules_at(rank).filter(|r| r.selector.matches(node)) {
            for (k, v) in &rule.declarations {
                apply_property(&mut style, k, v);
            }
        }
    }
    if let Some(inline) = node.attr("style") {
        for (k, v) in parse_declarations(inline) {
            apply_property(&mut style, &k, &v);
        }
    }
    style
}

/// Resolve styles for every node reachable from the root. Returns the
/// number of nodes resolved.
pub fn resolve_styles(tree: &mut NodeTree, sheet: &Stylesheet) -> usize {
    let handles = tree.walk();
    for &h in &handles {
        let Some(node) = tree.get(h) else { continue };
        let style = compute_style(node, sheet);
        if let Some(node) = tree.get_mut(h) {
            node.style = style;
            node.dirty = true;
        }
    }
    tracing::trace!(nodes = handles.len(), rules = sheet.rules.len(), "resolve_styles");
    handles.len()
}

/// The inheritable part of a node's style after walking its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InheritedStyle {
    pub color: u32,
    pub text_align: TextAlign,
    pub attrs: CellAttrs,
}

/// Resolve color, text-align and text attributes for `handle`: for each
/// property the node's own value wins if set explicitly, otherwise the
/// nearest ancestor that set it, otherwise the default.
pub fn inherited_style(tree: &NodeTree, handle: NodeHandle) -> InheritedStyle {
    let defaults = ComputedStyle::default();
    let mut out = InheritedStyle {
        color: defaults.color,
        text_align: defaults.text_align,
        attrs: defaults.attrs,
    };
    let mut pending = StyleMask::all();

    let chain = std::iter::once(handle).chain(tree.ancestors(handle));
    for h in chain {
        let Some(node) = tree.get(h) else { break };
        let s = &node.style;
        let found = s.explicit & pending;
        if found.contains(StyleMask::COLOR) {
            out.color = s.color;
        }
        if found.contains(StyleMask::TEXT_ALIGN) {
            out.text_align = s.text_align;
        }
        if found.contains(StyleMask::ATTRS) {
            out.attrs = s.attrs;
        }
        pending.remove(found);
        if pending.is_empty() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{indexed, NodeType};

    fn styled(decls: &[(&str, &str)]) -> ComputedStyle {
        let mut s = ComputedStyle::default();
        for (k, v) in decls {
            apply_property(&mut s, k, v);
        }
        s
    }

    #[test]
    fn test_defaults() {
        let s = ComputedStyle::default();
        assert_eq!(s.width, Dimension::Auto);
        assert_eq!(s.display, Display::Block);
        assert_eq!(s.flex_direction, FlexDirection::Column);
        assert_eq!(s.flex, 0.0);
        assert_eq!(s.position, Position::Static);
        assert_eq!(s.text_align, TextAlign::Left);
        assert!(!s.border);
    }

    #[test]
    fn test_padding_shorthand_counts() {
        assert_eq!(styled(&[("padding", "2")]).padding, Edges::all(2));
        assert_eq!(
            styled(&[("padding", "1 3")]).padding,
            Edges {
                top: 1,
                right: 3,
                bottom: 1,
                left: 3
            }
        );
        assert_eq!(
            styled(&[("margin", "1 2 3 4")]).margin,
            Edges {
                top: 1,
                right: 2,
                bottom: 3,
                left: 4
            }
        );
        // Three values is not a supported form: no-op.
        assert_eq!(styled(&[("padding", "1 2 3")]).padding, Edges::default());
        assert_eq!(
            styled(&[("padding", "2"), ("padding", "1 2 3")]).padding,
            Edges::all(2)
        );
    }

    #[test]
    fn test_border_on_unless_none() {
        assert!(styled(&[("border", "solid")]).border);
        assert!(styled(&[("border", "1")]).border);
        assert!(!styled(&[("border", "none")]).border);

        let s = styled(&[("border", "rounded")]);
        assert!(s.border);
        assert_eq!(s.border_style, BorderStyle::Rounded);
    }

    #[test]
    fn test_dimensions_and_degradation() {
        assert_eq!(parse_dimension("50%"), Dimension::Percent(50.0));
        assert_eq!(parse_dimension("12"), Dimension::Cells(12));
        assert_eq!(parse_dimension("12px"), Dimension::Cells(12));
        assert_eq!(parse_dimension("auto"), Dimension::Auto);
        assert_eq!(parse_dimension("wide"), Dimension::Auto);

        let s = styled(&[("padding-left", "lots"), ("flex", "abc")]);
        assert_eq!(s.padding.left, 0);
        assert_eq!(s.flex, 0.0);
    }

    #[test]
    fn test_cell_values_are_bounded() {
        assert_eq!(parse_dimension("1e10"), Dimension::Cells(MAX_CELLS));
        assert_eq!(parse_dimension("99999999999"), Dimension::Cells(MAX_CELLS));
        let s = styled(&[("padding", "99999999999"), ("margin-left", "-1e30"), ("top", "NaN")]);
        assert_eq!(s.padding, Edges::all(MAX_CELLS));
        assert_eq!(s.margin.left, -MAX_CELLS);
        assert_eq!(s.padding.horizontal(), 2 * MAX_CELLS);
        assert_eq!(s.top, Some(0));
        assert_eq!(parse_dimension("1e30%"), Dimension::Percent(MAX_CELLS as f32));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut s = ComputedStyle::default();
        assert!(!apply_property(&mut s, "z-index", "9"));
        assert_eq!(s, ComputedStyle::default());
    }

    #[test]
    fn test_cascade_precedence() {
        let sheet = Stylesheet::parse(
            r#"
            #title { color: blue }
            .a.b { color: green; text-align: right }
            .a { color: red; width: 10 }
            text { color: yellow; width: 4; height: 2 }
            "#,
        );
        let mut node = Node::new(NodeType::Text);
        node.id = "title".into();
        node.classes = vec!["a".into(), "b".into()];

        let s = compute_style(&node, &sheet);
        assert_eq!(s.color, indexed(4)); // id wins
        assert_eq!(s.text_align, TextAlign::Right); // multi-class
        assert_eq!(s.width, Dimension::Cells(10)); // class beats type
        assert_eq!(s.height, Dimension::Cells(2)); // type only
    }

    #[test]
    fn test_multi_class_requires_all() {
        let sheet = Stylesheet::parse(".a.b { color: green }");
        let mut node = Node::new(NodeType::Box);
        node.classes = vec!["a".into()];
        assert_eq!(compute_style(&node, &sheet).color, 0);
    }

    #[test]
    fn test_inline_style_applies_last() {
        let sheet = Stylesheet::parse("#x { color: blue }");
        let mut node = Node::new(NodeType::Box);
        node.id = "x".into();
        node.attributes
            .insert("style".into(), "color: red; flex: 2".into());
        let s = compute_style(&node, &sheet);
        assert_eq!(s.color, indexed(1));
        assert_eq!(s.flex, 2.0);
    }

    #[test]
    fn test_resolve_styles_walks_tree() {
        let mut tree = NodeTree::new();
        let root = tree.add_node(None, NodeType::Box, "root").unwrap();
        let t = tree.add_node(Some(root), NodeType::Text, "t").unwrap();
        let sheet = Stylesheet::parse("box { flex-direction: row } text { color: cyan }");

        assert_eq!(resolve_styles(&mut tree, &sheet), 2);
        assert_eq!(
            tree.node(root).unwrap().style.flex_direction,
            FlexDirection::Row
        );
        assert_eq!(tree.node(t).unwrap().style.color, indexed(6));
    }

    #[test]
    fn test_inherited_style_nearest_explicit_wins() {
        let mut tree = NodeTree::new();
        let root = tree.add_node(None, NodeType::Box, "root").unwrap();
        let mid = tree.add_node(Some(root), NodeType::Box, "mid").unwrap();
        let leaf = tree.add_node(Some(mid), NodeType::Text, "leaf").unwrap();

        apply_property(&mut tree.node_mut(root).unwrap().style, "color", "red");
        apply_property(&mut tree.node_mut(root).unwrap().style, "text-align", "center");
        apply_property(&mut tree.node_mut(mid).unwrap().style, "color", "green");

        let inh = inherited_style(&tree, leaf);
        assert_eq!(inh.color, indexed(2));
        assert_eq!(inh.text_align, TextAlign::Center);
        assert_eq!(inh.attrs, CellAttrs::empty());
    }
}
