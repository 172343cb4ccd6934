use log::debug;
use crate::flow_engine::{FlowKey, FlowMap};

pub const NODE_HEIGHT: f64 = 60.0;
pub const MIN_STROKE_WIDTH: f64 = 2.0;
pub const MAX_STROKE_WIDTH: f64 = 30.0;

/// Drawing area, in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub node_width: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas {
            width: 800,
            height: 600,
            margin: 100,
            node_width: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One drawn box. A hub participant gets one instance per side.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInstance {
    pub name: String,
    pub side: Side,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowCurve {
    pub key: FlowKey,
    pub amount: f64,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub stroke_width: f64,
}

impl FlowCurve {
    /// Cubic Bezier with both control points on the horizontal midpoint,
    /// leaving and entering the nodes horizontally.
    pub fn path(&self, node_width: f64) -> String {
        let (x1, y1) = self.start;
        let (x2, y2) = self.end;
        let direction = if x2 >= x1 { 1.0 } else { -1.0 };
        let mid_x = x1 + (x2 - x1) * 0.5;
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            x1 + direction * node_width,
            y1,
            mid_x,
            y1,
            mid_x,
            y2,
            x2 - direction * node_width,
            y2
        )
    }
}

/// Node positions and flow curves for a non-empty flow map.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: Vec<NodeInstance>,
    /// Largest amount first.
    pub curves: Vec<FlowCurve>,
    pub max_amount: f64,
    pub total_amount: f64,
}

impl Layout {
    /// Returns `None` for an empty flow map.
    pub fn compute(flows: &FlowMap, canvas: &Canvas) -> Option<Layout> {
        let max_amount = flows.max_amount()?;
        let (left, right) = assign_sides(flows);
        debug!("Layout: {} nodes on the left, {} on the right", left.len(), right.len());

        let left_x = f64::from(canvas.margin);
        let right_x = f64::from(canvas.width) - f64::from(canvas.margin);
        let mut nodes = place_column(&left, Side::Left, left_x, canvas);
        nodes.extend(place_column(&right, Side::Right, right_x, canvas));

        let curves = flows
            .sorted_by_amount_desc()
            .into_iter()
            .filter_map(|(key, amount)| {
                let start = position(&nodes, &key.sender, Side::Left)?;
                let end = position(&nodes, &key.receiver, Side::Right)?;
                Some(FlowCurve {
                    key: key.clone(),
                    amount,
                    start,
                    end,
                    stroke_width: stroke_width(amount, max_amount),
                })
            })
            .collect();

        Some(Layout {
            nodes,
            curves,
            max_amount,
            total_amount: flows.total_amount(),
        })
    }
}

/// Position of `name` on the preferred side, or on the other side if it only lives there.
fn position(nodes: &[NodeInstance], name: &str, preferred: Side) -> Option<(f64, f64)> {
    let on_side = |side: Side| nodes.iter().find(|node| node.name == name && node.side == side);
    let other = match preferred {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    };
    on_side(preferred)
        .or_else(|| on_side(other))
        .map(|node| (node.x, node.y))
}

/// Spreads `names` evenly between the top and bottom margins.
fn place_column(names: &[String], side: Side, x: f64, canvas: &Canvas) -> Vec<NodeInstance> {
    let margin = f64::from(canvas.margin);
    let span = f64::from(canvas.height) - 2.0 * margin;
    let gaps = names.len().saturating_sub(1).max(1) as f64;
    names
        .iter()
        .enumerate()
        .map(|(i, name)| NodeInstance {
            name: name.clone(),
            side,
            x,
            y: margin + i as f64 * span / gaps,
        })
        .collect()
}

/// Sender-only participants go left, receiver-only go right, hubs go to both.
/// Falls back to `split_evenly` if a side ends up empty.
pub fn assign_sides(flows: &FlowMap) -> (Vec<String>, Vec<String>) {
    let participants = flows.participants();
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &name in &participants {
        let is_sender = flows.iter().any(|(key, _)| key.sender == name);
        let is_receiver = flows.iter().any(|(key, _)| key.receiver == name);
        match (is_sender, is_receiver) {
            (true, false) => left.push(name.to_string()),
            (false, true) => right.push(name.to_string()),
            _ => {
                left.push(name.to_string());
                right.push(name.to_string());
            }
        }
    }
    if left.is_empty() || right.is_empty() {
        let names: Vec<String> = participants.into_iter().map(str::to_string).collect();
        return split_evenly(&names);
    }
    (left, right)
}

/// First half of the sorted names to the left, the rest to the right.
/// A list too short to split is put on both sides.
pub fn split_evenly(names: &[String]) -> (Vec<String>, Vec<String>) {
    let mut sorted = names.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if mid == 0 {
        return (sorted.clone(), sorted);
    }
    let right = sorted.split_off(mid);
    (sorted, right)
}

pub fn stroke_width(amount: f64, max_amount: f64) -> f64 {
    if max_amount <= 0.0 {
        return MIN_STROKE_WIDTH;
    }
    (amount / max_amount * MAX_STROKE_WIDTH).max(MIN_STROKE_WIDTH)
}
