//! Virtual element tree and patch types.
//!
//! Elements are built fresh for every frame and never mutated in place. The
//! reconciler compares two of them and emits [`Patch`]es; the patch applier
//! consumes the in-place subset.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An opaque unit that renders to an element subtree.
pub trait Component: fmt::Debug + Send + Sync {
    fn render(&self) -> Element;
}

pub type InlineStyles = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub enum Element {
    Markup {
        id: String,
        text: String,
    },
    Component {
        id: String,
        component: Arc<dyn Component>,
    },
    Container {
        id: String,
        children: Vec<Element>,
        inline_styles: InlineStyles,
    },
}

impl Element {
    pub fn markup(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Markup {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn component(id: impl Into<String>, component: Arc<dyn Component>) -> Self {
        Self::Component {
            id: id.into(),
            component,
        }
    }

    pub fn container<K, V>(
        id: impl Into<String>,
        styles: impl IntoIterator<Item = (K, V)>,
        children: Vec<Element>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Container {
            id: id.into(),
            children,
            inline_styles: styles
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Container without inline styles.
    pub fn group(id: impl Into<String>, children: Vec<Element>) -> Self {
        Self::Container {
            id: id.into(),
            children,
            inline_styles: InlineStyles::new(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Markup { id, .. } | Self::Component { id, .. } | Self::Container { id, .. } => {
                id
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Markup { .. } => "markup",
            Self::Component { .. } => "component",
            Self::Container { .. } => "container",
        }
    }

    pub(crate) fn same_kind(&self, other: &Element) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

// Components compare by identity; everything else structurally.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Markup { id: a, text: ta }, Self::Markup { id: b, text: tb }) => {
                a == b && ta == tb
            }
            (
                Self::Component {
                    id: a,
                    component: ca,
                },
                Self::Component {
                    id: b,
                    component: cb,
                },
            ) => a == b && Arc::ptr_eq(ca, cb),
            (
                Self::Container {
                    id: a,
                    children: ca,
                    inline_styles: sa,
                },
                Self::Container {
                    id: b,
                    children: cb,
                    inline_styles: sb,
                },
            ) => a == b && sa == sb && ca == cb,
            _ => false,
        }
    }
}

/// A single change between two element trees. Order within a batch matters.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    UpdateText {
        node_id: String,
        text: String,
    },
    UpdateStyle {
        node_id: String,
        styles: InlineStyles,
    },
    ReplaceNode {
        node_id: String,
        element: Element,
    },
    InsertNode {
        parent_id: String,
        element: Element,
        index: usize,
    },
    DeleteNode {
        node_id: String,
    },
}

impl Patch {
    /// Text and style updates can be applied to the live tree without a
    /// rebuild; everything else changes structure.
    pub fn is_in_place(&self) -> bool {
        matches!(self, Self::UpdateText { .. } | Self::UpdateStyle { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateText { .. } => "update_text",
            Self::UpdateStyle { .. } => "update_style",
            Self::ReplaceNode { .. } => "replace_node",
            Self::InsertNode { .. } => "insert_node",
            Self::DeleteNode { .. } => "delete_node",
        }
    }

    /// The ID the patch addresses (the parent for inserts).
    pub fn target(&self) -> &str {
        match self {
            Self::UpdateText { node_id, .. }
            | Self::UpdateStyle { node_id, .. }
            | Self::ReplaceNode { node_id, .. }
            | Self::DeleteNode { node_id } => node_id,
            Self::InsertNode { parent_id, .. } => parent_id,
        }
    }
}
