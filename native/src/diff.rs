//! Tree Diff / Reconciler.
//!
//! Compares two element trees and emits an ordered patch list. Children are
//! compared by index: reordering a list shows up as per-index updates and
//! replacements, not moves.

use crate::element::{Element, InlineStyles, Patch};

/// Diff `old` against `new`. The result is ordered: parent patches precede
/// their children's, siblings appear in index order.
///
/// Differing inline style maps produce an `UpdateStyle` carrying the added
/// and changed entries, with one exception. When the new map drops a key
/// that the old map had, the container gets a `ReplaceNode` instead, since
/// an overwrite cannot remove a declaration.
pub fn diff(old: Option<&Element>, new: Option<&Element>) -> Vec<Patch> {
    let mut patches = Vec::new();
    diff_into(old, new, &mut patches);
    patches
}

fn diff_into(old: Option<&Element>, new: Option<&Element>, out: &mut Vec<Patch>) {
    let (old, new) = match (old, new) {
        (None, _) => return,
        (Some(old), None) => {
            if !old.id().is_empty() {
                out.push(Patch::DeleteNode {
                    node_id: old.id().to_string(),
                });
            }
            return;
        }
        (Some(old), Some(new)) => (old, new),
    };

    if std::ptr::eq(old, new) {
        return;
    }

    if !old.same_kind(new) {
        out.push(replace(old, new));
        return;
    }

    match (old, new) {
        (Element::Markup { id, text: old_text }, Element::Markup { text: new_text, .. }) => {
            if old_text != new_text {
                out.push(Patch::UpdateText {
                    node_id: id.clone(),
                    text: new_text.clone(),
                });
            }
        }
        (Element::Component { .. }, Element::Component { .. }) => {
            out.push(replace(old, new));
        }
        (
            Element::Container {
                id,
                children: old_children,
                inline_styles: old_styles,
            },
            Element::Container {
                children: new_children,
                inline_styles: new_styles,
                ..
            },
        ) => {
            if old_styles != new_styles {
                match style_delta(old_styles, new_styles) {
                    Some(styles) => out.push(Patch::UpdateStyle {
                        node_id: id.clone(),
                        styles,
                    }),
                    // A dropped key cannot be expressed as an overwrite.
                    None => {
                        out.push(replace(old, new));
                        return;
                    }
                }
            }
            diff_children(id, old_children, new_children, out);
        }
        _ => out.push(replace(old, new)),
    }
}

fn replace(old: &Element, new: &Element) -> Patch {
    Patch::ReplaceNode {
        node_id: old.id().to_string(),
        element: new.clone(),
    }
}

/// Entries of `new` that are added or changed relative to `old`, or `None`
/// if `new` drops a key `old` had.
fn style_delta(old: &InlineStyles, new: &InlineStyles) -> Option<InlineStyles> {
    if old.keys().any(|k| !new.contains_key(k)) {
        return None;
    }
    Some(
        new.iter()
            .filter(|(k, v)| old.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn diff_children(parent_id: &str, old: &[Element], new: &[Element], out: &mut Vec<Patch>) {
    let common = old.len().min(new.len());
    for i in 0..common {
        diff_into(Some(&old[i]), Some(&new[i]), out);
    }
    for (index, element) in new.iter().enumerate().skip(common) {
        out.push(Patch::InsertNode {
            parent_id: parent_id.to_string(),
            element: element.clone(),
            index,
        });
    }
    for element in &old[common..] {
        diff_into(Some(element), None, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Component;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Clock;

    impl Component for Clock {
        fn render(&self) -> Element {
            Element::markup("clock", "12:00")
        }
    }

    fn screen(title: &str, color: &str) -> Element {
        Element::container(
            "root",
            [("color", color), ("padding", "1")],
            vec![Element::markup("title", title), Element::markup("footer", "bye")],
        )
    }

    #[test]
    fn test_identity_is_empty() {
        let el = screen("foo", "red");
        assert!(diff(Some(&el), Some(&el)).is_empty());
        assert!(diff(Some(&el), Some(&el.clone())).is_empty());
    }

    #[test]
    fn test_none_cases() {
        let el = Element::markup("a", "x");
        assert!(diff(None, Some(&el)).is_empty());
        assert!(diff(None, None).is_empty());
        assert_eq!(
            diff(Some(&el), None),
            vec![Patch::DeleteNode {
                node_id: "a".into()
            }]
        );
        assert!(diff(Some(&Element::markup("", "x")), None).is_empty());
    }

    #[test]
    fn test_text_only_change() {
        let patches = diff(Some(&screen("foo", "red")), Some(&screen("foobar", "red")));
        assert_eq!(
            patches,
            vec![Patch::UpdateText {
                node_id: "title".into(),
                text: "foobar".into()
            }]
        );
    }

    #[test]
    fn test_style_only_change_carries_changed_keys() {
        let patches = diff(Some(&screen("foo", "red")), Some(&screen("foo", "blue")));
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::UpdateStyle { node_id, styles } => {
                assert_eq!(node_id, "root");
                assert_eq!(styles.len(), 1);
                assert_eq!(styles.get("color").map(String::as_str), Some("blue"));
            }
            other => panic!("expected UpdateStyle, got {other:?}"),
        }
    }

    #[test]
    fn test_dropped_style_key_replaces() {
        let old = Element::container("box", [("color", "red"), ("flex", "1")], vec![]);
        let new = Element::container("box", [("color", "red")], vec![]);
        let patches = diff(Some(&old), Some(&new));
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::ReplaceNode { node_id, .. } if node_id == "box"));
    }

    #[test]
    fn test_kind_change_replaces() {
        let old = Element::markup("slot", "text");
        let new = Element::group("slot", vec![]);
        assert_eq!(
            diff(Some(&old), Some(&new)),
            vec![Patch::ReplaceNode {
                node_id: "slot".into(),
                element: new.clone()
            }]
        );
    }

    #[test]
    fn test_component_always_replaces() {
        let shared: Arc<dyn Component> = Arc::new(Clock);
        let a = Element::component("clock", shared.clone());
        let b = Element::component("clock", shared);
        let patches = diff(Some(&a), Some(&b));
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].kind(), "replace_node");
    }

    #[test]
    fn test_children_by_index_insert_and_delete() {
        let old = Element::group(
            "list",
            vec![Element::markup("a", "A"), Element::markup("b", "B")],
        );
        let grown = Element::group(
            "list",
            vec![
                Element::markup("a", "A"),
                Element::markup("b", "B"),
                Element::markup("c", "C"),
            ],
        );
        let shrunk = Element::group("list", vec![Element::markup("a", "A")]);

        assert_eq!(
            diff(Some(&old), Some(&grown)),
            vec![Patch::InsertNode {
                parent_id: "list".into(),
                element: Element::markup("c", "C"),
                index: 2
            }]
        );
        assert_eq!(
            diff(Some(&old), Some(&shrunk)),
            vec![Patch::DeleteNode {
                node_id: "b".into()
            }]
        );
    }

    #[test]
    fn test_reorder_is_per_index() {
        let old = Element::group(
            "list",
            vec![Element::markup("a", "A"), Element::markup("b", "B")],
        );
        let new = Element::group(
            "list",
            vec![Element::markup("b", "B"), Element::markup("a", "A")],
        );
        let patches = diff(Some(&old), Some(&new));
        assert_eq!(
            patches,
            vec![
                Patch::UpdateText {
                    node_id: "a".into(),
                    text: "B".into()
                },
                Patch::UpdateText {
                    node_id: "b".into(),
                    text: "A".into()
                },
            ]
        );
    }

    #[test]
    fn test_style_patch_precedes_child_patches() {
        let patches = diff(Some(&screen("foo", "red")), Some(&screen("bar", "blue")));
        let kinds: Vec<_> = patches.iter().map(Patch::kind).collect();
        assert_eq!(kinds, vec!["update_style", "update_text"]);
    }
}
