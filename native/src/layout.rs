//! Layout Module — Flexbox box assignment in terminal cells.
//!
//! Responsibilities:
//! - Top-down assignment of x/y/width/height from a viewport
//! - Fixed vs flexible partition along the main axis, cross-axis stretch
//! - Intrinsic sizing for auto, non-flexible children
//! - Absolute children positioned against the parent's content box
//! - Serializable layout snapshots for debugging and golden tests

use serde::Serialize;

use crate::error::Result;
use crate::text_utils::{display_width, max_line_width, split_lines};
use crate::tree::{NodeHandle, NodeTree};
use crate::types::{ComputedStyle, Display, Edges, FlexDirection, NodeType, Position, Rect, TextAlign};

/// Compute layout for the whole tree. Returns the elapsed time in µs.
pub fn compute_layout(tree: &mut NodeTree, width: u16, height: u16) -> u64 {
    let start = std::time::Instant::now();
    let Some(root) = tree.root() else {
        return 0;
    };

    let (vw, vh) = (width as i32, height as i32);
    let style = match tree.get(root) {
        Some(n) => n.style.clone(),
        None => return 0,
    };

    if style.display == Display::None {
        zero_subtree(tree, root);
    } else {
        let m = style.margin;
        let avail_w = vw.saturating_sub(m.horizontal()).max(0);
        let avail_h = vh.saturating_sub(m.vertical()).max(0);
        let w = style.width.resolve(vw).unwrap_or(avail_w);
        let h = style.height.resolve(vh).unwrap_or(avail_h);
        layout_node(tree, root, Rect::new(m.left, m.top, w, h));
    }

    tree.clear_dirty();
    let elapsed = start.elapsed().as_micros() as u64;
    tracing::trace!(nodes = tree.len(), elapsed_us = elapsed, "compute_layout");
    elapsed
}

/// A border is drawn (and insets the content) only when the box has room
/// for both edges on both axes.
pub fn draws_border(style: &ComputedStyle, width: i32, height: i32) -> bool {
    style.border && width >= 2 && height >= 2
}

/// Content box: the node's box minus border and padding.
pub fn content_box(style: &ComputedStyle, rect: Rect) -> Rect {
    let border = if draws_border(style, rect.w, rect.h) { 1 } else { 0 };
    rect.inset(Edges::all(border)).inset(style.padding)
}

/// Split `space` among flexible children proportional to their weights.
/// Each share is floored; the leftover cells go one at a time to the first
/// children in order.
pub fn distribute_flex(space: i32, weights: &[f32]) -> Vec<i32> {
    let n = weights.len();
    if n == 0 || space <= 0 {
        return vec![0; n];
    }

    let equal = weights.iter().all(|w| *w == weights[0]);
    let mut sizes: Vec<i32> = if equal {
        vec![space / n as i32; n]
    } else {
        let total: f64 = weights.iter().map(|w| *w as f64).sum();
        weights
            .iter()
            .map(|w| ((space as f64) * (*w as f64) / total + 1e-9).floor() as i32)
            .collect()
    };

    let mut remainder = space - sizes.iter().sum::<i32>();
    for size in sizes.iter_mut() {
        if remainder <= 0 {
            break;
        }
        *size += 1;
        remainder -= 1;
    }
    sizes
}

/// Horizontal paint offset of a line of `text_width` columns inside a box
/// of `box_width` columns.
pub fn text_align_offset(align: TextAlign, box_width: i32, text_width: i32) -> i32 {
    match align {
        TextAlign::Left => 0,
        TextAlign::Center => ((box_width - text_width) / 2).max(0),
        TextAlign::Right => (box_width - text_width).max(0),
    }
}

pub fn get_layout(tree: &NodeTree, handle: NodeHandle) -> Result<Rect> {
    let node = tree.node(handle)?;
    Ok(Rect::new(node.x, node.y, node.width, node.height))
}

fn set_rect(tree: &mut NodeTree, handle: NodeHandle, rect: Rect) {
    if let Some(node) = tree.get_mut(handle) {
        node.x = rect.x;
        node.y = rect.y;
        node.width = rect.w;
        node.height = rect.h;
    }
}

fn zero_subtree(tree: &mut NodeTree, handle: NodeHandle) {
    for h in tree.descendants(handle) {
        if let Some(node) = tree.get_mut(h) {
            node.width = 0;
            node.height = 0;
        }
    }
}

fn layout_node(tree: &mut NodeTree, handle: NodeHandle, rect: Rect) {
    set_rect(tree, handle, rect);

    let (style, children, node_type) = match tree.get(handle) {
        Some(n) => (n.style.clone(), n.children.clone(), n.node_type),
        None => return,
    };
    if node_type.is_leaf() {
        return;
    }

    let content = content_box(&style, rect);
    let mut flow = Vec::with_capacity(children.len());
    let mut absolute = Vec::new();

    for child in children {
        let Some(c) = tree.get(child) else { continue };
        if c.style.display == Display::None {
            zero_subtree(tree, child);
        } else if c.style.position == Position::Absolute {
            absolute.push(child);
        } else {
            flow.push(child);
        }
    }

    layout_flow(tree, style.flex_direction, content, &flow);
    for child in absolute {
        layout_absolute(tree, child, content);
    }
}

enum MainSize {
    Fixed(i32),
    Flex(f32),
}

struct FlowItem {
    handle: NodeHandle,
    main: MainSize,
    margin_before: i32,
    margin_after: i32,
    cross_before: i32,
    cross_after: i32,
    cross: crate::types::Dimension,
}

fn layout_flow(tree: &mut NodeTree, direction: FlexDirection, content: Rect, flow: &[NodeHandle]) {
    let row = direction == FlexDirection::Row;
    let (main_avail, cross_avail) = if row {
        (content.w, content.h)
    } else {
        (content.h, content.w)
    };

    let mut items = Vec::with_capacity(flow.len());
    for &handle in flow {
        let Some(node) = tree.get(handle) else { continue };
        let cs = &node.style;
        let m = cs.margin;
        let (main_dim, cross, mb, ma, cb, ca) = if row {
            (cs.width, cs.height, m.left, m.right, m.top, m.bottom)
        } else {
            (cs.height, cs.width, m.top, m.bottom, m.left, m.right)
        };
        let main = match main_dim.resolve(main_avail) {
            Some(n) => MainSize::Fixed(n),
            None if cs.flex > 0.0 => MainSize::Flex(cs.flex),
            None => MainSize::Fixed(intrinsic_size(tree, handle, row)),
        };
        items.push(FlowItem {
            handle,
            main,
            margin_before: mb,
            margin_after: ma,
            cross_before: cb,
            cross_after: ca,
            cross,
        });
    }

    let fixed_total: i32 = items
        .iter()
        .map(|it| {
            let size = match it.main {
                MainSize::Fixed(n) => n,
                MainSize::Flex(_) => 0,
            };
            size.saturating_add(it.margin_before)
                .saturating_add(it.margin_after)
        })
        .fold(0i32, i32::saturating_add);
    let remaining = main_avail.saturating_sub(fixed_total).max(0);

    let weights: Vec<f32> = items
        .iter()
        .filter_map(|it| match it.main {
            MainSize::Flex(w) => Some(w),
            MainSize::Fixed(_) => None,
        })
        .collect();
    let mut flex_sizes = distribute_flex(remaining, &weights).into_iter();

    let mut cursor: i32 = 0;
    for it in &items {
        let wanted = match it.main {
            MainSize::Fixed(n) => n,
            MainSize::Flex(_) => flex_sizes.next().unwrap_or(0),
        };
        cursor = cursor.saturating_add(it.margin_before);
        let size = wanted.min(main_avail.saturating_sub(cursor).max(0)).max(0);
        let pos = cursor;
        cursor = cursor.saturating_add(size).saturating_add(it.margin_after);

        let cross_space = cross_avail
            .saturating_sub(it.cross_before)
            .saturating_sub(it.cross_after)
            .max(0);
        let cross_size = it
            .cross
            .resolve(cross_avail)
            .unwrap_or(cross_space)
            .min(cross_space);

        let rect = if row {
            Rect::new(
                content.x.saturating_add(pos),
                content.y.saturating_add(it.cross_before),
                size,
                cross_size,
            )
        } else {
            Rect::new(
                content.x.saturating_add(it.cross_before),
                content.y.saturating_add(pos),
                cross_size,
                size,
            )
        };
        layout_node(tree, it.handle, rect);
    }
}

fn layout_absolute(tree: &mut NodeTree, handle: NodeHandle, cb: Rect) {
    let Some(node) = tree.get(handle) else { return };
    let s = node.style.clone();

    let w = match s.width.resolve(cb.w) {
        Some(n) => n,
        None => match (s.left, s.right) {
            (Some(l), Some(r)) => cb.w.saturating_sub(l).saturating_sub(r),
            _ => intrinsic_size(tree, handle, true),
        },
    }
    .max(0);
    let h = match s.height.resolve(cb.h) {
        Some(n) => n,
        None => match (s.top, s.bottom) {
            (Some(t), Some(b)) => cb.h.saturating_sub(t).saturating_sub(b),
            _ => intrinsic_size(tree, handle, false),
        },
    }
    .max(0);

    let x = match (s.left, s.right) {
        (Some(l), _) => cb.x.saturating_add(l),
        (None, Some(r)) => cb.right().saturating_sub(r).saturating_sub(w),
        (None, None) => cb.x,
    }
    .saturating_add(s.margin.left);
    let y = match (s.top, s.bottom) {
        (Some(t), _) => cb.y.saturating_add(t),
        (None, Some(b)) => cb.bottom().saturating_sub(b).saturating_sub(h),
        (None, None) => cb.y,
    }
    .saturating_add(s.margin.top);

    layout_node(tree, handle, Rect::new(x, y, w, h));
}

/// Width of an input's painted content: prompt, value (or placeholder) and
/// one cell for the cursor.
pub(crate) fn input_content_width(node: &crate::tree::Node) -> i32 {
    let prompt = node.attr("prompt").unwrap_or("");
    let body = if node.content.is_empty() {
        node.attr("placeholder").unwrap_or("")
    } else {
        node.content.as_str()
    };
    (display_width(prompt) + display_width(body) + 1) as i32
}

/// Natural size of a node along one axis, used when a flow child has an
/// auto main size and no flex factor.
pub fn intrinsic_size(tree: &NodeTree, handle: NodeHandle, horizontal: bool) -> i32 {
    let Some(node) = tree.get(handle) else {
        return 0;
    };
    let s = &node.style;
    if s.display == Display::None {
        return 0;
    }
    let dim = if horizontal { s.width } else { s.height };
    if let crate::types::Dimension::Cells(n) = dim {
        return n.max(0);
    }

    let padding = if horizontal {
        s.padding.horizontal()
    } else {
        s.padding.vertical()
    };
    let border = if s.border { 2 } else { 0 };

    let inner = match node.node_type {
        NodeType::Text => {
            if horizontal {
                max_line_width(&node.content) as i32
            } else {
                split_lines(&node.content).len() as i32
            }
        }
        NodeType::Input => {
            if horizontal {
                input_content_width(node)
            } else {
                1
            }
        }
        NodeType::Box => {
            let along = (s.flex_direction == FlexDirection::Row) == horizontal;
            let sizes = node.children.iter().filter_map(|&c| {
                let child = tree.get(c)?;
                if child.style.display == Display::None
                    || child.style.position == Position::Absolute
                {
                    return None;
                }
                let m = child.style.margin;
                let margins = if horizontal {
                    m.horizontal()
                } else {
                    m.vertical()
                };
                Some(intrinsic_size(tree, c, horizontal).saturating_add(margins))
            });
            if along {
                sizes.fold(0i32, i32::saturating_add)
            } else {
                sizes.max().unwrap_or(0)
            }
        }
    };

    inner.saturating_add(padding).saturating_add(border).max(0)
}

// ============================================================================
// Snapshots
// ============================================================================

/// Computed geometry of a subtree, for debugging dumps and golden tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutBox {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutBox>,
}

pub fn snapshot(tree: &NodeTree) -> Option<LayoutBox> {
    tree.root().and_then(|r| snapshot_node(tree, r))
}

fn snapshot_node(tree: &NodeTree, handle: NodeHandle) -> Option<LayoutBox> {
    let node = tree.get(handle)?;
    Some(LayoutBox {
        id: node.id.clone(),
        node_type: node.node_type.name(),
        x: node.x,
        y: node.y,
        width: node.width,
        height: node.height,
        children: node
            .children
            .iter()
            .filter_map(|&c| snapshot_node(tree, c))
            .collect(),
    })
}
