use std::collections::{HashMap, VecDeque};

use crate::{Node, Operation, Pointer};

/// Emits an order-preserving edit script for two arrays.
///
/// Right elements are paired greedily with the earliest unused equal left
/// element. The longest run of pairs whose left indices increase stays in
/// place; every other left element is removed (highest index first) and every
/// other right element is inserted at its final index (lowest first).
pub(super) fn diff_lists(lhs: &[Node], rhs: &[Node], path: &Pointer, out: &mut Vec<Operation>) {
    let pairs = candidate_pairs(lhs, rhs);
    let seq: Vec<usize> = pairs.iter().map(|&(a_idx, _)| a_idx).collect();

    let mut kept_lhs = vec![false; lhs.len()];
    let mut kept_rhs = vec![false; rhs.len()];
    for pos in longest_increasing_subsequence(&seq) {
        let (a_idx, b_idx) = pairs[pos];
        kept_lhs[a_idx] = true;
        kept_rhs[b_idx] = true;
    }

    for (idx, _) in kept_lhs.iter().enumerate().rev().filter(|(_, kept)| !**kept) {
        out.push(Operation::remove(path.child(idx.to_string()).to_string()));
    }
    for (idx, _) in kept_rhs.iter().enumerate().filter(|(_, kept)| !**kept) {
        out.push(Operation::add(path.child(idx.to_string()).to_string(), rhs[idx].clone()));
    }
}

/// Pairs each right element, in order, with the earliest unconsumed left
/// element carrying the same token.
fn candidate_pairs(lhs: &[Node], rhs: &[Node]) -> Vec<(usize, usize)> {
    let mut positions: HashMap<String, VecDeque<usize>> = HashMap::with_capacity(lhs.len());
    for (idx, node) in lhs.iter().enumerate() {
        positions.entry(token(node)).or_default().push_back(idx);
    }
    let mut pairs = Vec::with_capacity(lhs.len().min(rhs.len()));
    for (b_idx, node) in rhs.iter().enumerate() {
        if let Some(a_idx) = positions.get_mut(&token(node)).and_then(VecDeque::pop_front) {
            pairs.push((a_idx, b_idx));
        }
    }
    pairs
}

/// Comparison key of an array element.
///
/// Scalars carry a type prefix so `"1"`, `1` and `true` never collide;
/// containers use their JSON encoding, which is key-ordered.
fn token(node: &Node) -> String {
    match node {
        Node::Null => "0".to_string(),
        Node::Bool(true) => "b:1".to_string(),
        Node::Bool(false) => "b:0".to_string(),
        Node::Number(n) => format!("n:{}", n.canonical()),
        Node::String(s) => format!("s:{s}"),
        Node::Array(_) | Node::Object(_) => format!("j:{node}"),
    }
}

/// Returns positions in `seq` forming a longest strictly increasing
/// subsequence, in ascending order.
///
/// Patience construction: `tails[len]` holds the position of the smallest tail
/// of any increasing run of length `len + 1`, `prev` links each position to its
/// predecessor in the run it extends.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (pos, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&tail| seq[tail] < value);
        if slot > 0 {
            prev[pos] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(pos);
        } else {
            tails[slot] = pos;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        run.push(pos);
        cursor = prev[pos];
    }
    run.reverse();
    run
}
