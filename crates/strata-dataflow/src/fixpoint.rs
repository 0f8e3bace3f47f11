//! Generic backward fixpoint driver
//!
//! Solves, over any finite graph,
//!
//! ```text
//! OUT(n) = join { IN(s) | s ∈ succ(n) }
//! IN(n)  = transfer(n, OUT(n))
//! ```
//!
//! starting from `bottom` everywhere and sweeping every node until a full
//! sweep changes neither IN nor OUT anywhere. With a monotone transfer over a
//! finite lattice the result is the least fixpoint, independent of the order
//! in which nodes are visited.

use log::trace;

use crate::{BitSet, Cfg};

/// IN/OUT per node at convergence
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<T> {
    pub ins: Vec<T>,
    pub outs: Vec<T>,
    /// Full sweeps performed, including the final unchanged one
    pub sweeps: usize,
}

/// Solve a backward problem, visiting nodes last to first in each sweep
pub fn solve_backward<T, J, F>(succ: &[Vec<usize>], bottom: T, join: J, transfer: F) -> Solution<T>
where
    T: Clone + PartialEq,
    J: Fn(&mut T, &T),
    F: Fn(usize, &T) -> T,
{
    let order: Vec<usize> = (0..succ.len()).rev().collect();
    solve_backward_in_order(succ, &order, bottom, join, transfer)
}

/// Solve a backward problem with an explicit visitation order
///
/// `order` must mention every node; the result does not depend on it.
pub fn solve_backward_in_order<T, J, F>(
    succ: &[Vec<usize>],
    order: &[usize],
    bottom: T,
    join: J,
    transfer: F,
) -> Solution<T>
where
    T: Clone + PartialEq,
    J: Fn(&mut T, &T),
    F: Fn(usize, &T) -> T,
{
    let mut ins = vec![bottom.clone(); succ.len()];
    let mut outs = vec![bottom.clone(); succ.len()];
    let mut sweeps = 0;

    let mut changed = true;
    while changed {
        changed = false;
        sweeps += 1;
        for &node in order {
            let mut new_out = bottom.clone();
            for &s in &succ[node] {
                join(&mut new_out, &ins[s]);
            }
            if new_out != outs[node] {
                outs[node] = new_out;
                changed = true;
            }

            let new_in = transfer(node, &outs[node]);
            if new_in != ins[node] {
                ins[node] = new_in;
                changed = true;
            }
        }
    }

    trace!("backward fixpoint over {} nodes in {} sweeps", succ.len(), sweeps);
    Solution { ins, outs, sweeps }
}

/// The classic gen/kill instance over a CFG:
/// `IN(b) = USE(b) ∪ (OUT(b) \ DEF(b))`, join is union
pub fn solve_bitsets(cfg: &Cfg, uses: &[BitSet], defs: &[BitSet], width: usize) -> Solution<BitSet> {
    solve_backward(&cfg.successors(), BitSet::new(width), union, |b, out| {
        let mut live_in = out.clone();
        live_in.subtract(&defs[b]);
        live_in.union_with(&uses[b]);
        live_in
    })
}

fn union(acc: &mut BitSet, other: &BitSet) {
    acc.union_with(other);
}
