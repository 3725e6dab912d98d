// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Structural joins between two span sets of one trace
//!
//! `lhs op rhs` relates each right span to the left set. Every relation
//! is answered with parent indices and child lists of [`IndexedTrace`],
//! so a join is linear in the size of both sets times the tree depth.

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use crate::core::{JoinMode, Relation, StructuralOperator};
use crate::model::IndexedTrace;

/// Apply a structural operator
///
/// - `Match` keeps right spans with at least one related left span.
/// - `Negated` keeps right spans with no related left span. A right span
///   is kept even when the left side is empty.
/// - `Union` keeps matched right spans plus the left spans that took part.
pub fn join(
    trace: &IndexedTrace,
    op: StructuralOperator,
    lhs: &RoaringBitmap,
    rhs: &RoaringBitmap,
) -> RoaringBitmap {
    let matched = related(trace, op.relation, lhs, rhs);
    match op.mode {
        JoinMode::Match => matched,
        JoinMode::Negated => rhs - &matched,
        JoinMode::Union => {
            if matched.is_empty() {
                return matched;
            }
            let left = related(trace, inverse(op.relation), &matched, lhs);
            matched | left
        }
    }
}

/// The relation seen from the other side
fn inverse(relation: Relation) -> Relation {
    match relation {
        Relation::Descendant => Relation::Ancestor,
        Relation::Ancestor => Relation::Descendant,
        Relation::Child => Relation::Parent,
        Relation::Parent => Relation::Child,
        Relation::Sibling => Relation::Sibling,
    }
}

/// Right spans standing in `relation` to at least one left span
fn related(
    trace: &IndexedTrace,
    relation: Relation,
    lhs: &RoaringBitmap,
    rhs: &RoaringBitmap,
) -> RoaringBitmap {
    if lhs.is_empty() || rhs.is_empty() {
        return RoaringBitmap::new();
    }
    match relation {
        Relation::Descendant => rhs
            .iter()
            .filter(|&r| ancestors(trace, r).any(|a| lhs.contains(a)))
            .collect(),
        Relation::Ancestor => {
            let mut marked = RoaringBitmap::new();
            for l in lhs {
                for a in ancestors(trace, l) {
                    // Everything above an already marked span is marked too
                    if !marked.insert(a) {
                        break;
                    }
                }
            }
            marked & rhs
        }
        Relation::Child => rhs
            .iter()
            .filter(|&r| trace.parent(r).is_some_and(|p| lhs.contains(p)))
            .collect(),
        Relation::Parent => rhs
            .iter()
            .filter(|&r| trace.children(r).iter().any(|&c| lhs.contains(c)))
            .collect(),
        Relation::Sibling => {
            let mut per_parent: FxHashMap<u32, u32> = FxHashMap::default();
            for l in lhs {
                if let Some(p) = trace.parent(l) {
                    *per_parent.entry(p).or_default() += 1;
                }
            }
            rhs.iter()
                .filter(|&r| {
                    let Some(p) = trace.parent(r) else {
                        return false;
                    };
                    match per_parent.get(&p) {
                        Some(&n) if n > 1 => true,
                        Some(_) => !lhs.contains(r),
                        None => false,
                    }
                })
                .collect()
        }
    }
}

/// Proper ancestors of a span, nearest first
fn ancestors(trace: &IndexedTrace, span: u32) -> impl Iterator<Item = u32> + '_ {
    std::iter::successors(trace.parent(span), move |&p| trace.parent(p))
}
