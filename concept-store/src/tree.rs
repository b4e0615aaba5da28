//! Forest view over the flat concept relation.
//!
//! Concepts point at their parent by name. `build_forest` resolves those
//! names against a snapshot and materializes one tree per root. The view is
//! never persisted and never mutates the concepts it was built from.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::concept::{Concept, name_key};

/// A concept and its resolved children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// The concept at this node.
    pub concept: Concept,

    /// Child nodes, in input order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Height of this subtree (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    /// Find a node in this subtree by concept name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        if self.concept.has_name(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}

/// Build the forest for a snapshot of concepts.
///
/// A concept is a root when its parent is empty or does not resolve to a
/// different concept of the snapshot. Roots and siblings keep input order.
pub fn build_forest(concepts: &[Concept]) -> Vec<TreeNode> {
    let links = ForestLinks::resolve(concepts);
    links
        .roots
        .iter()
        .map(|&root| materialize(concepts, &links.children, root))
        .collect()
}

/// Total number of nodes in a forest.
pub fn forest_size(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::size).sum()
}

/// Pre-order walk of a forest, yielding each node with its level (roots are 0).
pub fn depth_first(forest: &[TreeNode]) -> Vec<(usize, &TreeNode)> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, &TreeNode)> = forest.iter().rev().map(|n| (0, n)).collect();

    while let Some((level, node)) = stack.pop() {
        out.push((level, node));
        stack.extend(node.children.iter().rev().map(|c| (level + 1, c)));
    }

    out
}

struct ForestLinks {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl ForestLinks {
    fn resolve(concepts: &[Concept]) -> Self {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (index, concept) in concepts.iter().enumerate() {
            by_name.entry(name_key(&concept.name)).or_insert(index);
        }

        let mut parent_of: Vec<Option<usize>> = concepts
            .iter()
            .enumerate()
            .map(|(index, concept)| {
                concept
                    .parent_name()
                    .and_then(|parent| by_name.get(&name_key(parent)).copied())
                    .filter(|&parent| parent != index)
            })
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); concepts.len()];
        for (index, parent) in parent_of.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(index);
            }
        }

        let mut reachable = vec![false; concepts.len()];
        for index in 0..concepts.len() {
            if parent_of[index].is_none() {
                mark_reachable(&children, &mut reachable, index);
            }
        }

        // Anything still unreachable sits on or below a cycle. Promote the
        // earliest member of that cycle so every concept lands in the forest.
        for index in 0..concepts.len() {
            if reachable[index] {
                continue;
            }
            let head = cycle_head(&parent_of, index);
            if let Some(parent) = parent_of[head].take() {
                children[parent].retain(|&child| child != head);
            }
            warn!(
                "Parent cycle through {}; treating it as a root",
                concepts[head].name
            );
            mark_reachable(&children, &mut reachable, head);
        }

        let roots = (0..concepts.len())
            .filter(|&index| parent_of[index].is_none())
            .collect();

        Self { roots, children }
    }
}

fn mark_reachable(children: &[Vec<usize>], reachable: &mut [bool], start: usize) {
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if reachable[index] {
            continue;
        }
        reachable[index] = true;
        stack.extend(children[index].iter().copied());
    }
}

/// Follow parents from `start` until a node repeats and return the earliest
/// (lowest input index) node of the cycle found.
fn cycle_head(parent_of: &[Option<usize>], start: usize) -> usize {
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut path = Vec::new();
    let mut current = start;

    loop {
        if let Some(&pos) = position.get(&current) {
            return path[pos..].iter().copied().min().unwrap_or(current);
        }
        position.insert(current, path.len());
        path.push(current);
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

fn materialize(concepts: &[Concept], children: &[Vec<usize>], index: usize) -> TreeNode {
    TreeNode {
        concept: concepts[index].clone(),
        children: children[index]
            .iter()
            .map(|&child| materialize(concepts, children, child))
            .collect(),
    }
}
