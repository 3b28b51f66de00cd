//! Patch Applier — in-place text/style updates on the live layout tree.
//!
//! Only batches made entirely of `UpdateText` / `UpdateStyle` are applied.
//! Every target is resolved before anything is mutated, so a batch either
//! applies completely or leaves the tree untouched.

use crate::element::Patch;
use crate::error::{LotusError, Result};
use crate::style::apply_property;
use crate::stylesheet::{format_declarations, parse_declarations};
use crate::tree::{NodeHandle, NodeTree};

/// Whether `patches` can take the fast path.
pub fn is_fast_path(patches: &[Patch]) -> bool {
    patches.iter().all(Patch::is_in_place)
}

/// Apply an in-place batch. Fails with `StructuralPatch` if any patch
/// changes structure, or `PatchTargetNotFound` if any ID is missing; in
/// both cases nothing has been changed and the caller should rebuild.
pub fn apply_patches(tree: &mut NodeTree, patches: &[Patch]) -> Result<()> {
    if let Some(p) = patches.iter().find(|p| !p.is_in_place()) {
        return Err(LotusError::StructuralPatch(p.kind()));
    }

    let targets = patches
        .iter()
        .map(|p| {
            tree.find_by_id(p.target())
                .ok_or_else(|| LotusError::PatchTargetNotFound(p.target().to_string()))
        })
        .collect::<Result<Vec<NodeHandle>>>()?;

    for (patch, handle) in patches.iter().zip(targets) {
        let node = tree.node_mut(handle)?;
        match patch {
            Patch::UpdateText { text, .. } => {
                node.content.clone_from(text);
            }
            Patch::UpdateStyle { styles, .. } => {
                // Keys are matched the way a rebuild parses the inline attribute.
                let styles: Vec<(String, String)> = styles
                    .iter()
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                    .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                    .collect();
                for (k, v) in &styles {
                    apply_property(&mut node.style, k, v);
                }
                let mut inline: std::collections::BTreeMap<String, String> = node
                    .attr("style")
                    .map(parse_declarations)
                    .unwrap_or_default()
                    .into_iter()
                    .collect();
                inline.extend(styles);
                node.attributes
                    .insert("style".to_string(), format_declarations(&inline));
            }
            _ => {}
        }
        tree.mark_dirty(handle);
    }

    tracing::trace!(count = patches.len(), "applied patches in place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, InlineStyles};
    use crate::types::{indexed, TextAlign};

    fn live_tree() -> NodeTree {
        NodeTree::from_element(&Element::container(
            "root",
            [("color", "red")],
            vec![Element::markup("title", "foo"), Element::markup("", "anon")],
        ))
    }

    fn styles(pairs: &[(&str, &str)]) -> InlineStyles {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fast_path_classification() {
        let text = Patch::UpdateText {
            node_id: "a".into(),
            text: "x".into(),
        };
        let del = Patch::DeleteNode {
            node_id: "a".into(),
        };
        assert!(is_fast_path(&[]));
        assert!(is_fast_path(&[text.clone()]));
        assert!(!is_fast_path(&[text, del]));
    }

    #[test]
    fn test_update_text() {
        let mut tree = live_tree();
        tree.clear_dirty();
        apply_patches(
            &mut tree,
            &[Patch::UpdateText {
                node_id: "title".into(),
                text: "foobar".into(),
            }],
        )
        .unwrap();
        let h = tree.find_by_id("title").unwrap();
        assert_eq!(tree.node(h).unwrap().content, "foobar");
        assert!(tree.node(h).unwrap().dirty);
        assert!(tree.node(tree.root().unwrap()).unwrap().dirty);
    }

    #[test]
    fn test_update_style_overwrites_present_keys_only() {
        let mut tree = live_tree();
        let root = tree.root().unwrap();
        {
            let style = &mut tree.node_mut(root).unwrap().style;
            apply_property(style, "color", "red");
            apply_property(style, "padding", "2");
        }

        apply_patches(
            &mut tree,
            &[Patch::UpdateStyle {
                node_id: "root".into(),
                styles: styles(&[("color", "blue"), ("text-align", "center"), ("bogus", "1")]),
            }],
        )
        .unwrap();

        let node = tree.node(root).unwrap();
        assert_eq!(node.style.color, indexed(4));
        assert_eq!(node.style.text_align, TextAlign::Center);
        assert_eq!(node.style.padding.top, 2);
        assert_eq!(
            node.attr("style"),
            Some("bogus: 1; color: blue; text-align: center")
        );
    }

    #[test]
    fn test_update_style_keys_are_case_insensitive() {
        let mut tree = live_tree();
        let root = tree.root().unwrap();
        apply_patches(
            &mut tree,
            &[Patch::UpdateStyle {
                node_id: "root".into(),
                styles: styles(&[(" Color ", "blue"), ("TEXT-ALIGN", "right")]),
            }],
        )
        .unwrap();

        let node = tree.node(root).unwrap();
        assert_eq!(node.style.color, indexed(4));
        assert_eq!(node.style.text_align, TextAlign::Right);
        assert_eq!(node.attr("style"), Some("color: blue; text-align: right"));
    }

    #[test]
    fn test_missing_target_leaves_tree_untouched() {
        let mut tree = live_tree();
        let err = apply_patches(
            &mut tree,
            &[
                Patch::UpdateText {
                    node_id: "title".into(),
                    text: "changed".into(),
                },
                Patch::UpdateText {
                    node_id: "ghost".into(),
                    text: "x".into(),
                },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LotusError::PatchTargetNotFound(ref id) if id == "ghost"));
        assert!(err.requires_rebuild());

        let h = tree.find_by_id("title").unwrap();
        assert_eq!(tree.node(h).unwrap().content, "foo");
    }

    #[test]
    fn test_empty_id_is_not_addressable() {
        let mut tree = live_tree();
        let err = apply_patches(
            &mut tree,
            &[Patch::UpdateText {
                node_id: String::new(),
                text: "x".into(),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, LotusError::PatchTargetNotFound(_)));
    }

    #[test]
    fn test_structural_patch_rejected() {
        let mut tree = live_tree();
        let err = apply_patches(
            &mut tree,
            &[Patch::InsertNode {
                parent_id: "root".into(),
                element: Element::markup("n", "new"),
                index: 0,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, LotusError::StructuralPatch("insert_node")));
        assert_eq!(tree.len(), 3);
    }
}
