use log::debug;

use super::{
    classifier::{classify, SweepPlan},
    config::{TimeDomain, YScale},
    erase::occluder_bounds,
    sample::{Rect, Sample},
};

/// Draw index of the frozen previous sweep.
pub const RIGHT_DRAW_ORDER: usize = 0;
/// Draw index of the occluder, between the two sweeps.
pub const OCCLUDER_DRAW_ORDER: usize = 1;
/// Draw index of the sweep receiving data.
pub const LEFT_DRAW_ORDER: usize = 2;

/// A line series on the rendering surface. Lower draw order is drawn first.
pub trait DrawableSeries {
    fn append(&mut self, points: &[Sample]);
    fn clear(&mut self);
    fn set_draw_order(&mut self, index: usize);
}

/// A filled rectangle on the rendering surface.
pub trait DrawableRect {
    fn set_bounds(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn set_draw_order(&mut self, index: usize);
}

/// In-memory series; renderers read it back every frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepBuffer {
    points: Vec<Sample>,
    draw_order: usize,
}
impl SweepBuffer {
    pub fn points(&self) -> &[Sample] {
        &self.points
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn draw_order(&self) -> usize {
        self.draw_order
    }
}
impl DrawableSeries for SweepBuffer {
    fn append(&mut self, points: &[Sample]) {
        self.points.extend_from_slice(points);
    }
    fn clear(&mut self) {
        self.points.clear();
    }
    fn set_draw_order(&mut self, index: usize) {
        self.draw_order = index;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Occluder {
    bounds: Rect,
    draw_order: usize,
}
impl Occluder {
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
    pub fn draw_order(&self) -> usize {
        self.draw_order
    }
}
impl DrawableRect for Occluder {
    fn set_bounds(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.bounds = Rect { x1, y1, x2, y2 };
    }
    fn set_draw_order(&mut self, index: usize) {
        self.draw_order = index;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    A,
    B,
}
impl Slot {
    fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Result of applying one batch, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Empty batch, nothing changed.
    Idle,
    Appended { count: usize },
    Wrapped { finished: usize, started: usize },
    Overflow { wraps: usize },
}

/// One drawable layer, yielded in draw order.
#[derive(Clone, Copy, Debug)]
pub enum Layer<'a> {
    Previous(&'a SweepBuffer),
    Occluder(Rect),
    Current(&'a SweepBuffer),
}

/// Sweeping state of a single channel.
///
/// Two series slots alternate between the "left" role (receiving the current
/// sweep) and the "right" role (holding the previous sweep until it is
/// overdrawn). Roles are exchanged by flipping `left`, never by moving data.
#[derive(Debug)]
pub struct SweepWindow<S = SweepBuffer, R = Occluder> {
    domain: TimeDomain,
    y_scale: YScale,
    y_range: (f64, f64),
    head: f64,
    slots: [S; 2],
    left: Slot,
    occluder: R,
}

impl SweepWindow {
    pub fn new(domain: TimeDomain, y_scale: YScale) -> Self {
        Self::with_surfaces(
            domain,
            y_scale,
            SweepBuffer::default(),
            SweepBuffer::default(),
            Occluder::default(),
        )
    }
    pub fn left(&self) -> &SweepBuffer {
        self.left_series()
    }
    pub fn right(&self) -> &SweepBuffer {
        self.right_series()
    }
    pub fn occluder(&self) -> &Occluder {
        &self.occluder
    }
    /// Layers sorted by draw order, lowest first.
    pub fn layers(&self) -> Vec<Layer<'_>> {
        let mut layers = vec![
            (self.right().draw_order(), Layer::Previous(self.right())),
            (
                self.occluder.draw_order(),
                Layer::Occluder(self.occluder.bounds()),
            ),
            (self.left().draw_order(), Layer::Current(self.left())),
        ];
        layers.sort_by_key(|(order, _)| *order);
        layers.into_iter().map(|(_, layer)| layer).collect()
    }
}

impl<S: DrawableSeries, R: DrawableRect> SweepWindow<S, R> {
    /// Builds a window over caller-provided surfaces. `first` starts as the left series.
    pub fn with_surfaces(
        domain: TimeDomain,
        y_scale: YScale,
        first: S,
        second: S,
        occluder: R,
    ) -> Self {
        let mut window = Self {
            domain,
            y_scale,
            y_range: y_scale.initial_range(),
            head: 0.0,
            slots: [first, second],
            left: Slot::A,
            occluder,
        };
        window.assign_draw_order();
        window.update_occluder();
        window
    }
    pub fn head(&self) -> f64 {
        self.head
    }
    pub fn domain(&self) -> TimeDomain {
        self.domain
    }
    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }
    pub fn left_series(&self) -> &S {
        &self.slots[self.index(self.left)]
    }
    pub fn right_series(&self) -> &S {
        &self.slots[self.index(self.left.other())]
    }
    pub fn occluder_surface(&self) -> &R {
        &self.occluder
    }

    /// Classifies `batch` against the current head and applies it.
    pub fn apply(&mut self, batch: &[Sample]) -> SweepOutcome {
        let Some(classified) = classify(self.head, self.domain, batch) else {
            return SweepOutcome::Idle;
        };
        let outcome = match classified.plan {
            SweepPlan::Append(samples) => {
                self.expand_y_range(&samples);
                self.apply_no_wrap(&samples);
                SweepOutcome::Appended {
                    count: samples.len(),
                }
            }
            SweepPlan::Wrap { current, next } => {
                self.expand_y_range(&current);
                self.expand_y_range(&next);
                self.apply_one_wrap(&current, &next);
                SweepOutcome::Wrapped {
                    finished: current.len(),
                    started: next.len(),
                }
            }
            SweepPlan::Overflow { wraps } => {
                debug!(
                    "dropping batch of {} samples spanning {wraps} sweeps",
                    batch.len()
                );
                self.apply_overflow();
                SweepOutcome::Overflow { wraps }
            }
        };
        self.head = classified.head;
        self.update_occluder();
        outcome
    }
    pub fn apply_no_wrap(&mut self, samples: &[Sample]) {
        self.left_mut().append(samples);
    }
    pub fn apply_one_wrap(&mut self, current: &[Sample], next: &[Sample]) {
        self.left_mut().append(current);
        self.left = self.left.other();
        self.assign_draw_order();
        let left = self.left_mut();
        left.clear();
        left.append(next);
    }
    pub fn apply_overflow(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }
    /// Clears both sweeps and moves the head back to the left edge.
    pub fn reset(&mut self) {
        self.apply_overflow();
        self.head = 0.0;
        self.y_range = self.y_scale.initial_range();
        self.update_occluder();
    }

    fn index(&self, slot: Slot) -> usize {
        match slot {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
    fn left_mut(&mut self) -> &mut S {
        let idx = self.index(self.left);
        &mut self.slots[idx]
    }
    fn right_mut(&mut self) -> &mut S {
        let idx = self.index(self.left.other());
        &mut self.slots[idx]
    }
    fn assign_draw_order(&mut self) {
        self.right_mut().set_draw_order(RIGHT_DRAW_ORDER);
        self.occluder.set_draw_order(OCCLUDER_DRAW_ORDER);
        self.left_mut().set_draw_order(LEFT_DRAW_ORDER);
    }
    fn expand_y_range(&mut self, samples: &[Sample]) {
        if let YScale::Expansion { .. } = self.y_scale {
            for s in samples.iter().filter(|s| s.y.is_finite()) {
                self.y_range.0 = self.y_range.0.min(s.y);
                self.y_range.1 = self.y_range.1.max(s.y);
            }
        }
    }
    fn update_occluder(&mut self) {
        let (y_min, y_max) = self.y_range;
        let rect = occluder_bounds(self.head, self.domain, y_min, y_max);
        self.occluder.set_bounds(rect.x1, rect.y1, rect.x2, rect.y2);
    }
}
