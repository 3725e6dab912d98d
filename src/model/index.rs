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

//! Flat, index-addressed view of a trace
//!
//! Spans keep their position in [`Trace::spans`]. Parent links become
//! indices, children are precomputed, and every reachable span receives
//! nested-set numbers from a depth-first walk so ancestor tests are two
//! integer comparisons.
//!
//! A span is *corrupt* when
//! - its span id repeats an earlier span of the trace,
//! - its parent id names no span of the trace, or
//! - it cannot be reached from any root (a parent cycle).
//!
//! Corrupt spans are excluded from [`IndexedTrace::valid`]. A span whose
//! parent is missing still anchors its own subtree so its descendants stay
//! queryable.

use std::sync::Arc;

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::trace::{Span, SpanId, Trace};

/// Children of one span; most spans have few
pub type ChildList = SmallVec<[u32; 4]>;

/// A trace prepared for evaluation
#[derive(Debug)]
pub struct IndexedTrace {
    trace: Arc<Trace>,
    parent: Vec<Option<u32>>,
    children: Vec<ChildList>,
    /// Nested-set numbers, zero for spans the walk never reached
    left: Vec<u32>,
    right: Vec<u32>,
    valid: RoaringBitmap,
    corrupt: usize,
    root: Option<u32>,
    start_time: u64,
    duration: i64,
}

impl IndexedTrace {
    /// Index a trace
    pub fn new(trace: Arc<Trace>) -> Self {
        let n = trace.spans.len();
        let mut by_id: FxHashMap<SpanId, u32> = FxHashMap::default();
        by_id.reserve(n);
        let mut duplicate = vec![false; n];

        for (i, span) in trace.spans.iter().enumerate() {
            if by_id.insert(span.span_id, i as u32).is_some() {
                duplicate[i] = true;
            }
        }
        // The first occurrence of an id owns it
        for (i, span) in trace.spans.iter().enumerate().rev() {
            if !duplicate[i] {
                by_id.insert(span.span_id, i as u32);
            }
        }

        let mut parent = vec![None; n];
        let mut children = vec![ChildList::new(); n];
        let mut orphan = vec![false; n];
        let mut tops = Vec::new();

        for (i, span) in trace.spans.iter().enumerate() {
            if duplicate[i] {
                continue;
            }
            match span.parent_span_id {
                None => tops.push(i as u32),
                Some(pid) => match by_id.get(&pid) {
                    Some(&p) if p as usize != i => {
                        parent[i] = Some(p);
                        children[p as usize].push(i as u32);
                    }
                    Some(_) => {} // self-parented, never reached
                    None => {
                        orphan[i] = true;
                        tops.push(i as u32);
                    }
                },
            }
        }

        let mut left = vec![0u32; n];
        let mut right = vec![0u32; n];
        let mut counter = 1u32;
        let mut stack: Vec<(u32, usize)> = Vec::new();
        for &top in &tops {
            left[top as usize] = counter;
            counter += 1;
            stack.push((top, 0));
            while let Some((node, next_child)) = stack.last_mut() {
                let node_children = &children[*node as usize];
                if let Some(&child) = node_children.get(*next_child) {
                    *next_child += 1;
                    left[child as usize] = counter;
                    counter += 1;
                    stack.push((child, 0));
                } else {
                    right[*node as usize] = counter;
                    counter += 1;
                    stack.pop();
                }
            }
        }

        let mut valid = RoaringBitmap::new();
        let mut corrupt = 0;
        for i in 0..n {
            if duplicate[i] || orphan[i] || left[i] == 0 {
                corrupt += 1;
            } else {
                valid.insert(i as u32);
            }
        }

        let root = tops
            .iter()
            .copied()
            .find(|&i| !orphan[i as usize] && trace.spans[i as usize].parent_span_id.is_none());

        let start_time = trace.start_time();
        let duration = trace.duration_nanos();

        Self {
            trace,
            parent,
            children,
            left,
            right,
            valid,
            corrupt,
            root,
            start_time,
            duration,
        }
    }

    pub fn trace(&self) -> &Arc<Trace> {
        &self.trace
    }

    pub fn len(&self) -> usize {
        self.trace.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.spans.is_empty()
    }

    pub fn span(&self, index: u32) -> &Span {
        &self.trace.spans[index as usize]
    }

    /// Spans that take part in evaluation
    pub fn valid(&self) -> &RoaringBitmap {
        &self.valid
    }

    /// Number of spans excluded as corrupt
    pub fn corrupt_count(&self) -> usize {
        self.corrupt
    }

    pub fn parent(&self, index: u32) -> Option<u32> {
        self.parent[index as usize]
    }

    pub fn children(&self, index: u32) -> &[u32] {
        &self.children[index as usize]
    }

    /// Nested-set left number, zero when unreachable
    pub fn nested_left(&self, index: u32) -> u32 {
        self.left[index as usize]
    }

    pub fn nested_right(&self, index: u32) -> u32 {
        self.right[index as usize]
    }

    /// True when `ancestor` is a proper ancestor of `descendant`
    pub fn is_ancestor(&self, ancestor: u32, descendant: u32) -> bool {
        let (a, d) = (ancestor as usize, descendant as usize);
        self.left[a] != 0
            && self.left[d] != 0
            && self.left[a] < self.left[d]
            && self.right[d] < self.right[a]
    }

    /// The span with no parent, when the trace has one
    pub fn root(&self) -> Option<&Span> {
        self.root.map(|i| self.span(i))
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Trace-wide duration in nanoseconds
    pub fn duration(&self) -> i64 {
        self.duration
    }
}
