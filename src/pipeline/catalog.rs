//! Display ordering and grouping for activation layers.
//!
//! Names such as `conv1`, `layer2.block0.conv1` or `fc2` encode their depth;
//! the catalog reads that convention and never relies on the order the
//! layers arrived in.

use serde::Serialize;

use crate::model::{LayerActivations, Tensor2D};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Convolutional,
    Dense,
    /// Name did not match any known prefix
    Other,
}

/// Known stage prefixes in network order.
const STAGE_PREFIXES: &[(&str, Stage)] = &[
    ("stem", Stage::Convolutional),
    ("conv", Stage::Convolutional),
    ("layer", Stage::Convolutional),
    ("block", Stage::Convolutional),
    ("res", Stage::Convolutional),
    ("dense", Stage::Dense),
    ("linear", Stage::Dense),
    ("fc", Stage::Dense),
    ("classifier", Stage::Dense),
    ("head", Stage::Dense),
];

/// Sort key for one layer name. Field order is the comparison order: a
/// whole top-level family (`conv1`, `conv1.block0`, ...) sorts as one unit,
/// and members within it follow the numbers after the first `.`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DepthKey {
    stage: Stage,
    prefix_rank: usize,
    head_depth: Vec<u64>,
    head: String,
    rest: Vec<u64>,
}

fn depth_key(name: &str) -> DepthKey {
    let lower = name.to_ascii_lowercase();
    let (head, rest) = lower.split_once('.').unwrap_or((lower.as_str(), ""));

    let (prefix_rank, stage) = STAGE_PREFIXES
        .iter()
        .enumerate()
        .find(|(_, (prefix, _))| head.starts_with(prefix))
        .map(|(rank, (_, stage))| (rank, *stage))
        .unwrap_or((0, Stage::Other));

    // Unrecognised heads sort by name alone
    let head_depth = match stage {
        Stage::Other => Vec::new(),
        _ => numbers_in(head),
    };

    DepthKey {
        stage,
        prefix_rank,
        head_depth,
        head: head.to_string(),
        rest: numbers_in(rest),
    }
}

/// Every run of ASCII digits in `name`, in order.
fn numbers_in(name: &str) -> Vec<u64> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse().unwrap_or(u64::MAX))
        .collect()
}

pub fn stage_of(name: &str) -> Stage {
    depth_key(name).stage
}

/// Order layers for display: recognised families by stage, prefix and
/// numeric depth, unrecognised families after them by name. Each family's
/// sub-layers follow it directly. The sort is stable over the activation
/// map's name order, so exact ties stay in name order.
pub fn order(layers: &LayerActivations) -> Vec<(&str, &Tensor2D)> {
    let mut entries: Vec<(DepthKey, &str, &Tensor2D)> = layers
        .iter()
        .map(|(name, tensor)| (depth_key(name), name, tensor))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, name, _) in &entries {
        log::debug!("catalog: {} -> {:?} {:?} {:?}", name, key.stage, key.head_depth, key.rest);
    }

    entries
        .into_iter()
        .map(|(_, name, tensor)| (name, tensor))
        .collect()
}

/// A top-level stage plus the internal layers that hang off it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerGroup<T> {
    /// First dot-separated segment shared by all members
    pub parent: String,
    pub stage: Stage,
    pub members: Vec<(String, T)>,
}

/// Group an ordered layer list by top-level name segment, keeping order.
///
/// Groups are formed from consecutive runs; [`order`] keeps every family
/// contiguous.
pub fn group<T>(ordered: Vec<(String, T)>) -> Vec<LayerGroup<T>> {
    let mut groups: Vec<LayerGroup<T>> = Vec::new();
    for (name, item) in ordered {
        let parent = name.split('.').next().unwrap_or(&name).to_string();
        if let Some(g) = groups.last_mut().filter(|g| g.parent == parent) {
            g.members.push((name, item));
            continue;
        }
        groups.push(LayerGroup {
            stage: stage_of(&parent),
            parent,
            members: vec![(name, item)],
        });
    }
    groups
}
