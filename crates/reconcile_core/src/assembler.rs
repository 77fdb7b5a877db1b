//! Path assembly: stitch the unordered segments of one route direction into a
//! single oriented shape.
//!
//! Community map routes are a patchwork of independently drawn ways. The
//! assembler walks them in the order given, flipping each one so that it
//! continues from where the previous one ended. Roundabouts are spliced so
//! that only the arc between entry and exit is kept. When two consecutive
//! segments do not share a point the assembler still produces a path, picking
//! the orientation with the shortest jump, and reports the discontinuity
//! through [`Shape::has_gaps`].

use reconcile_model::{Coordinate, Segment, Shape};
use tracing::debug;

use crate::geo::ldist2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    #[error("segment {index} has {len} point(s), at least 2 are required")]
    DegenerateSegment { index: usize, len: usize },
    #[error("segment {index} contains a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

/// Assembles `segments` into one shape.
///
/// With a single segment the optional `anchor` (first stop or platform)
/// decides the orientation: the anchor always ends up nearer the first point.
/// Only structurally invalid segments are rejected; discontinuities are
/// reported through `has_gaps`.
pub fn assemble(segments: &[Segment], anchor: Option<Coordinate>) -> Result<Shape, AssembleError> {
    validate_segments(segments)?;
    let shape = match segments {
        [] => Shape::empty(),
        [single] => Shape::new(orient_single(single, anchor), false),
        _ => Chain::new(segments).build(),
    };
    Ok(shape)
}

/// Picks the anchor of a route from its members: the first stop, or when the
/// route has no stops, the first platform.
pub fn anchor_from_members(stops: &[Coordinate], platforms: &[Coordinate]) -> Option<Coordinate> {
    stops.first().or_else(|| platforms.first()).copied()
}

fn validate_segments(segments: &[Segment]) -> Result<(), AssembleError> {
    for (index, segment) in segments.iter().enumerate() {
        if segment.len() < 2 {
            return Err(AssembleError::DegenerateSegment {
                index,
                len: segment.len(),
            });
        }
        if !segment.points.iter().all(Coordinate::is_finite) {
            return Err(AssembleError::NonFiniteCoordinate { index });
        }
    }
    Ok(())
}

fn orient_single(segment: &Segment, anchor: Option<Coordinate>) -> Vec<Coordinate> {
    let mut points = segment.points.clone();
    if let (Some(anchor), Some(first), Some(last)) = (anchor, segment.first(), segment.last()) {
        if ldist2(anchor, first) > ldist2(anchor, last) {
            points.reverse();
        }
    }
    points
}

struct Chain<'a> {
    segments: &'a [Segment],
    points: Vec<Coordinate>,
    has_gaps: bool,
}

impl<'a> Chain<'a> {
    fn new(segments: &'a [Segment]) -> Self {
        let capacity = segments.iter().map(Segment::len).sum();
        Self {
            segments,
            points: Vec::with_capacity(capacity),
            has_gaps: false,
        }
    }

    fn build(mut self) -> Shape {
        self.start();
        // Index-based so that a roundabout can peek at the segment after it.
        for index in 1..self.segments.len() {
            self.append(index);
        }
        Shape::new(self.points, self.has_gaps)
    }

    /// Seeds the chain with the first segment, oriented so that it ends where
    /// the second segment touches it.
    fn start(&mut self) {
        let segments = self.segments;
        let (first, second) = (&segments[0], &segments[1]);
        let (head, tail) = endpoints(first);
        let (next_head, next_tail) = endpoints(second);

        let forward = if tail == next_head || tail == next_tail {
            true
        } else if head == next_head || head == next_tail {
            false
        } else if second.is_circular() && second.contains(tail) {
            true
        } else if second.is_circular() && second.contains(head) {
            false
        } else {
            self.has_gaps = true;
            debug!(
                "gap between first two segments {:?} and {:?}",
                first.id, second.id
            );
            let from_head = ldist2(head, next_head).min(ldist2(head, next_tail));
            let from_tail = ldist2(tail, next_head).min(ldist2(tail, next_tail));
            from_tail < from_head
        };

        if forward {
            self.points.extend_from_slice(&first.points);
        } else {
            self.points.extend(first.points.iter().rev());
        }
    }

    fn append(&mut self, index: usize) {
        let segments = self.segments;
        let segment = &segments[index];
        let Some(last) = self.points.last().copied() else {
            self.points.extend_from_slice(&segment.points);
            return;
        };
        let (head, tail) = endpoints(segment);

        if segment.is_circular() {
            if !segment.roundabout {
                debug!(
                    "circular segment {:?} is not tagged as a roundabout",
                    segment.id
                );
            }
            self.splice_ring(index, last);
        } else if head == last {
            self.points.extend_from_slice(&segment.points[1..]);
        } else if tail == last {
            self.points.extend(segment.points.iter().rev().skip(1));
        } else {
            self.bridge_gap(segment, last);
        }
    }

    /// Appends the part of a circular segment between the point where the
    /// chain enters it and the point where the following segment leaves it.
    fn splice_ring(&mut self, index: usize, last: Coordinate) {
        let segments = self.segments;
        let ring = &segments[index];
        let is_final = index + 1 == segments.len();
        let entry = ring.position(last);
        let exit = segments
            .get(index + 1)
            .and_then(|next| exit_position(ring, next));

        match (entry, exit) {
            (Some(entry), Some(exit)) => push_arc(&mut self.points, ring, entry, exit),
            (Some(entry), None) => {
                // A loop at the end of the route is a turning circle; anywhere
                // else the way out of the ring is missing.
                if !is_final {
                    self.has_gaps = true;
                    debug!("no exit from circular segment {:?}", ring.id);
                }
                push_arc(&mut self.points, ring, entry, entry);
            }
            (None, Some(exit)) => {
                self.has_gaps = true;
                debug!("no entry into circular segment {:?}", ring.id);
                push_arc(&mut self.points, ring, exit, exit);
            }
            (None, None) => self.bridge_gap(ring, last),
        }
    }

    fn bridge_gap(&mut self, segment: &Segment, last: Coordinate) {
        self.has_gaps = true;
        debug!("gap before segment {:?}", segment.id);
        let (head, tail) = endpoints(segment);
        if ldist2(last, head) < ldist2(last, tail) {
            self.points.extend_from_slice(&segment.points);
        } else {
            self.points.extend(segment.points.iter().rev());
        }
    }
}

fn endpoints(segment: &Segment) -> (Coordinate, Coordinate) {
    (segment.points[0], segment.points[segment.points.len() - 1])
}

/// Where `next` touches `ring`: one of its endpoints for an ordinary segment,
/// any shared vertex when `next` is itself circular.
fn exit_position(ring: &Segment, next: &Segment) -> Option<usize> {
    if next.is_circular() {
        return ring.points.iter().position(|point| next.contains(*point));
    }
    let (head, tail) = endpoints(next);
    ring.position(head).or_else(|| ring.position(tail))
}

/// Walks `ring` forward from `from` (exclusive) to `to` (inclusive), wrapping
/// past the closing vertex. `from == to` yields the full loop.
fn push_arc(points: &mut Vec<Coordinate>, ring: &Segment, from: usize, to: usize) {
    // The closing vertex repeats the first one.
    let distinct = ring.points.len() - 1;
    let mut k = from % distinct;
    let to = to % distinct;
    loop {
        k = (k + 1) % distinct;
        points.push(ring.points[k]);
        if k == to {
            break;
        }
    }
}
