//! Segment and trajectory engine
//!
//! A trajectory is an ordered list of linear and circular segments anchored at
//! a start pose. It can be stepped with a fixed increment (for collision
//! validation or playback), rolled back by one step, and cut at the current
//! cursor.

use crate::common::{CollisionOracle, PlannerError, PlannerResult, Point2D, Pose2D};
use crate::utils::geometry::rotate_vector;

/// Default validation increment [m]
pub const DEFAULT_STEP_SIZE: f64 = 0.1;

/// Segments shorter than this are dropped after a cut
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// What to do when a collision shows up after the walk already made progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationPolicy {
    /// Give up on the whole trajectory
    Reject,
    /// Keep the collision-free prefix, cut one increment before the hit
    Chunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationCause {
    LengthCap,
    Collision,
}

/// Result of a collision-checked walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationOutcome {
    /// All segments walked without a collision
    Complete,
    /// Trajectory was cut short and is still usable
    Truncated(TruncationCause),
    /// Trajectory must be discarded
    Rejected,
}

impl TruncationOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, TruncationOutcome::Rejected)
    }

    /// Rejections always count as truncated.
    pub fn is_truncated(&self) -> bool {
        !matches!(self, TruncationOutcome::Complete)
    }
}

/// Outcome of stepping a single segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentStep {
    /// Cursor moved, the new pose is inside the segment
    Advanced(Pose2D),
    /// Segment exhausted; `remainder` of the increment was not used
    Complete { remainder: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Cursor {
    current: f64,
    previous: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearSegment {
    pub start: Point2D,
    pub end: Point2D,
    pub start_ori: Point2D,
    pub length: f64,
    /// +1 forward, -1 reverse
    pub direction: f64,
    cursor: Cursor,
}

impl LinearSegment {
    pub fn new(start: Point2D, ori: Point2D, length: f64, forward: bool) -> Self {
        let start_ori = ori.normalize();
        let direction = if forward { 1.0 } else { -1.0 };
        LinearSegment {
            start,
            end: start + start_ori * (direction * length),
            start_ori,
            length,
            direction,
            cursor: Cursor::default(),
        }
    }

    pub fn is_forward(&self) -> bool {
        self.direction > 0.0
    }

    fn pose_at(&self, s: f64) -> Pose2D {
        Pose2D {
            position: self.start + self.start_ori * (self.direction * s),
            heading: self.start_ori,
        }
    }

    fn cut_at_cursor(&mut self) {
        self.length = self.cursor.current;
        self.end = self.start + self.start_ori * (self.direction * self.length);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveSegment {
    pub start: Point2D,
    pub start_ori: Point2D,
    /// Signed swept angle, counter-clockwise positive
    pub angle: f64,
    pub radius: f64,
    /// Center of the turn lies to the right of the start heading
    pub right: bool,
    pub end: Point2D,
    pub end_ori: Point2D,
    pub length: f64,
    pub center: Point2D,
    cursor: Cursor,
}

impl CurveSegment {
    pub fn new(start: Point2D, ori: Point2D, angle: f64, radius: f64, right: bool) -> Self {
        let start_ori = ori.normalize();
        let center_dir = if right {
            Point2D::new(start_ori.y, -start_ori.x)
        } else {
            Point2D::new(-start_ori.y, start_ori.x)
        };
        let center = start + center_dir * radius;
        let mut seg = CurveSegment {
            start,
            start_ori,
            angle,
            radius,
            right,
            end: start,
            end_ori: start_ori,
            length: angle.abs() * radius,
            center,
            cursor: Cursor::default(),
        };
        seg.update_end();
        seg
    }

    fn rotated(&self, swept: f64) -> Pose2D {
        Pose2D {
            position: rotate_vector(&(self.start - self.center), swept) + self.center,
            heading: rotate_vector(&self.start_ori, swept).normalize(),
        }
    }

    fn update_end(&mut self) {
        let end = self.rotated(self.angle);
        self.end = end.position;
        self.end_ori = end.heading;
    }

    fn pose_at(&self, s: f64) -> Pose2D {
        if self.length <= 0.0 {
            return self.rotated(0.0);
        }
        self.rotated(self.angle * s / self.length)
    }

    fn cut_at_cursor(&mut self) {
        if self.length > 0.0 {
            self.angle *= self.cursor.current / self.length;
        }
        self.length = self.angle.abs() * self.radius;
        self.update_end();
    }
}

/// A trajectory primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Linear(LinearSegment),
    Curve(CurveSegment),
}

impl Segment {
    pub fn start(&self) -> Point2D {
        match self {
            Segment::Linear(l) => l.start,
            Segment::Curve(c) => c.start,
        }
    }

    pub fn end(&self) -> Point2D {
        match self {
            Segment::Linear(l) => l.end,
            Segment::Curve(c) => c.end,
        }
    }

    pub fn start_ori(&self) -> Point2D {
        match self {
            Segment::Linear(l) => l.start_ori,
            Segment::Curve(c) => c.start_ori,
        }
    }

    pub fn end_ori(&self) -> Point2D {
        match self {
            Segment::Linear(l) => l.start_ori,
            Segment::Curve(c) => c.end_ori,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Segment::Linear(l) => l.length,
            Segment::Curve(c) => c.length,
        }
    }

    pub fn start_pose(&self) -> Pose2D {
        Pose2D { position: self.start(), heading: self.start_ori() }
    }

    pub fn end_pose(&self) -> Pose2D {
        Pose2D { position: self.end(), heading: self.end_ori() }
    }

    /// Pose after travelling `s` along the segment, `s` clamped into [0, length]
    pub fn pose_at(&self, s: f64) -> Pose2D {
        let s = s.clamp(0.0, self.length());
        match self {
            Segment::Linear(l) => l.pose_at(s),
            Segment::Curve(c) => c.pose_at(s),
        }
    }

    /// Points along the segment spaced at most `resolution` apart, both ends included.
    pub fn sample(&self, resolution: f64) -> Vec<Point2D> {
        let length = self.length();
        let n = if resolution > 0.0 { (length / resolution).ceil().max(1.0) as usize } else { 1 };
        (0..=n)
            .map(|i| self.pose_at(length * i as f64 / n as f64).position)
            .collect()
    }

    fn cursor(&self) -> &Cursor {
        match self {
            Segment::Linear(l) => &l.cursor,
            Segment::Curve(c) => &c.cursor,
        }
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        match self {
            Segment::Linear(l) => &mut l.cursor,
            Segment::Curve(c) => &mut c.cursor,
        }
    }

    pub fn progress(&self) -> f64 {
        self.cursor().current
    }

    pub fn reset_cursor(&mut self) {
        *self.cursor_mut() = Cursor::default();
    }

    /// Advance the cursor by `increment`. Past the end, the cursor is clamped
    /// and the unused part of the increment is handed back.
    pub fn step(&mut self, increment: f64) -> SegmentStep {
        let length = self.length();
        let cursor = self.cursor_mut();
        if increment > length - cursor.current {
            let remainder = increment - (length - cursor.current);
            cursor.current = length;
            return SegmentStep::Complete { remainder };
        }
        cursor.previous = cursor.current;
        cursor.current += increment;
        let s = cursor.current;
        SegmentStep::Advanced(self.pose_at(s))
    }

    /// Undo the last in-segment advance
    pub fn restore_last_step(&mut self) {
        let cursor = self.cursor_mut();
        cursor.current = cursor.previous;
    }

    fn set_progress(&mut self, s: f64) {
        let cursor = self.cursor_mut();
        cursor.current = s;
        cursor.previous = s;
    }

    /// Permanently shrink the segment so it ends at the cursor.
    pub fn truncate_at_cursor(&mut self) {
        match self {
            Segment::Linear(l) => l.cut_at_cursor(),
            Segment::Curve(c) => c.cut_at_cursor(),
        }
    }

    /// Copy of the geometry with a fresh cursor
    pub fn detached(&self) -> Segment {
        let mut seg = self.clone();
        seg.reset_cursor();
        seg
    }
}

fn validate_step_length(step_length: f64) -> PlannerResult<()> {
    if !(step_length.is_finite() && step_length > 0.0) {
        return Err(PlannerError::InvalidParameter(format!(
            "step length must be positive and finite, got {}",
            step_length
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StepSnapshot {
    active: usize,
    progress: f64,
    pose: Pose2D,
}

/// Ordered sequence of segments with a stepping cursor
#[derive(Debug, Clone)]
pub struct Trajectory {
    start: Pose2D,
    end: Pose2D,
    current: Pose2D,
    segments: Vec<Segment>,
    length: f64,
    step_length: f64,
    active: usize,
    snapshot: Option<StepSnapshot>,
}

impl Trajectory {
    /// Empty trajectory at `start`. The step length must be positive and finite.
    pub fn new(start: Pose2D, step_length: f64) -> PlannerResult<Self> {
        validate_step_length(step_length)?;
        Ok(Trajectory {
            start,
            end: start,
            current: start,
            segments: Vec::new(),
            length: 0.0,
            step_length,
            active: 0,
            snapshot: None,
        })
    }

    pub fn start_pose(&self) -> Pose2D {
        self.start
    }

    pub fn end_pose(&self) -> Pose2D {
        self.end
    }

    pub fn current_pose(&self) -> Pose2D {
        self.current
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn set_step_length(&mut self, step_length: f64) -> PlannerResult<()> {
        validate_step_length(step_length)?;
        self.reset_cursor();
        self.step_length = step_length;
        Ok(())
    }

    /// Rewind stepping state to the start pose. Geometry is untouched.
    pub fn reset_cursor(&mut self) {
        self.current = self.start;
        self.active = 0;
        self.snapshot = None;
        for seg in &mut self.segments {
            seg.reset_cursor();
        }
    }

    fn push(&mut self, seg: Segment) {
        self.end = seg.end_pose();
        self.length += seg.length();
        self.segments.push(seg);
        self.reset_cursor();
    }

    pub fn append_linear(&mut self, length: f64, forward: bool) {
        let seg = LinearSegment::new(self.end.position, self.end.heading, length, forward);
        self.push(Segment::Linear(seg));
    }

    /// Append an arc sweeping `angle` (counter-clockwise positive) on a circle
    /// of `radius` whose center is to the right of the heading when `right`.
    pub fn append_curve(&mut self, angle: f64, radius: f64, right: bool) {
        let seg = CurveSegment::new(self.end.position, self.end.heading, angle, radius, right);
        self.push(Segment::Curve(seg));
    }

    /// Re-create `seg`'s shape at the current end of this trajectory.
    pub fn append_segment(&mut self, seg: &Segment) {
        match seg {
            Segment::Linear(l) => self.append_linear(l.length, l.is_forward()),
            Segment::Curve(c) => self.append_curve(c.angle, c.radius, c.right),
        }
    }

    fn refresh_end(&mut self) {
        self.end = self.segments.last().map_or(self.start, Segment::end_pose);
        self.length = self.segments.iter().map(Segment::length).sum();
    }

    pub fn remove_last(&mut self) {
        if self.segments.pop().is_some() {
            self.refresh_end();
            self.reset_cursor();
        }
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.refresh_end();
        self.reset_cursor();
    }

    fn advance(&mut self, distance: f64) -> bool {
        if self.segments.is_empty() {
            return true;
        }
        self.snapshot = Some(StepSnapshot {
            active: self.active,
            progress: self.segments.get(self.active).map_or(0.0, Segment::progress),
            pose: self.current,
        });

        let mut remaining = distance;
        while let Some(seg) = self.segments.get_mut(self.active) {
            match seg.step(remaining) {
                SegmentStep::Advanced(pose) => {
                    self.current = pose;
                    break;
                }
                SegmentStep::Complete { remainder } => {
                    remaining = remainder;
                    self.active += 1;
                }
            }
        }

        if self.active >= self.segments.len() {
            self.current = self.end;
            return true;
        }
        false
    }

    /// Advance by one step length. Returns `true` once every segment is
    /// consumed; the cursor then rests on the end pose.
    pub fn step(&mut self) -> bool {
        self.advance(self.step_length)
    }

    /// Undo the most recent step. Only one step of history is kept.
    pub fn restore_last_step(&mut self) {
        let Some(snap) = self.snapshot.take() else {
            return;
        };
        for seg in self.segments.iter_mut().skip(snap.active + 1) {
            seg.reset_cursor();
        }
        if let Some(seg) = self.segments.get_mut(snap.active) {
            seg.set_progress(snap.progress);
        }
        self.active = snap.active;
        self.current = snap.pose;
    }

    /// Cut the trajectory at the cursor, dropping everything after it.
    fn truncate_now(&mut self) {
        if self.active >= self.segments.len() {
            return;
        }
        self.segments.truncate(self.active + 1);
        if let Some(last) = self.segments.last_mut() {
            last.truncate_at_cursor();
            if last.length() < MIN_SEGMENT_LENGTH {
                self.segments.pop();
            }
        }
        self.refresh_end();
        self.reset_cursor();
    }

    /// Walk the trajectory in steps of `step_length`, asking `oracle` about
    /// every pose reached, and cut it where the walk has to stop.
    ///
    /// A collision on the very first increment always rejects. A later one
    /// rejects under [`TruncationPolicy::Reject`] and cuts one increment back
    /// under [`TruncationPolicy::Chunk`]. Running into `max_length` with
    /// segments left cuts there.
    pub fn truncate<O>(
        &mut self,
        oracle: &O,
        max_length: Option<f64>,
        safety_margin: f64,
        policy: TruncationPolicy,
    ) -> TruncationOutcome
    where
        O: CollisionOracle + ?Sized,
    {
        self.reset_cursor();
        if self.segments.is_empty() {
            return TruncationOutcome::Complete;
        }

        let mut travelled = 0.0;
        loop {
            let mut increment = self.step_length;
            if let Some(cap) = max_length {
                let left = cap - travelled;
                if left <= MIN_SEGMENT_LENGTH {
                    self.truncate_now();
                    return TruncationOutcome::Truncated(TruncationCause::LengthCap);
                }
                increment = increment.min(left);
            }

            let finished = self.advance(increment);
            if oracle.collides(&self.current, safety_margin) {
                if policy == TruncationPolicy::Chunk && travelled > 0.0 {
                    self.restore_last_step();
                    self.truncate_now();
                    return TruncationOutcome::Truncated(TruncationCause::Collision);
                }
                return TruncationOutcome::Rejected;
            }
            travelled += increment;

            if finished {
                self.reset_cursor();
                return TruncationOutcome::Complete;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FreeSpace;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn assert_pose_eq(a: &Pose2D, b: &Pose2D) {
        assert_abs_diff_eq!(a.position.x, b.position.x, epsilon = 1e-6);
        assert_abs_diff_eq!(a.position.y, b.position.y, epsilon = 1e-6);
        assert_abs_diff_eq!(a.heading.x, b.heading.x, epsilon = 1e-6);
        assert_abs_diff_eq!(a.heading.y, b.heading.y, epsilon = 1e-6);
    }

    fn mixed() -> Trajectory {
        let mut t = Trajectory::new(Pose2D::origin(), DEFAULT_STEP_SIZE).unwrap();
        t.append_linear(2.0, true);
        t.append_curve(PI / 2.0, 3.0, false);
        t.append_linear(1.5, false);
        t.append_curve(-PI / 4.0, 2.0, true);
        t
    }

    #[test]
    fn test_segment_match_covers_all_kinds() {
        // adding a kind without touching every consumer fails to compile here
        let segs = [
            Segment::Linear(LinearSegment::new(Point2D::zeros(), Point2D::x(), 1.0, true)),
            Segment::Curve(CurveSegment::new(Point2D::zeros(), Point2D::x(), 1.0, 1.0, false)),
        ];
        for seg in &segs {
            let kind = match seg {
                Segment::Linear(_) => "linear",
                Segment::Curve(_) => "curve",
            };
            assert!(!kind.is_empty());
        }
    }

    #[test]
    fn test_curve_geometry() {
        let left = CurveSegment::new(Point2D::zeros(), Point2D::x(), PI / 2.0, 2.0, false);
        assert_abs_diff_eq!(left.center.y, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.end.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.end.y, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.end_ori.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.length, PI, epsilon = 1e-12);

        // right turn forward sweeps clockwise
        let right = CurveSegment::new(Point2D::zeros(), Point2D::x(), -PI / 2.0, 2.0, true);
        assert_abs_diff_eq!(right.end.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(right.end.y, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(right.end_ori.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_segment_step_overflow() {
        let mut seg = Segment::Linear(LinearSegment::new(Point2D::zeros(), Point2D::x(), 1.0, true));
        assert!(matches!(seg.step(0.6), SegmentStep::Advanced(_)));
        match seg.step(0.6) {
            SegmentStep::Complete { remainder } => assert_abs_diff_eq!(remainder, 0.2, epsilon = 1e-12),
            other => panic!("expected overflow, got {:?}", other),
        }
        assert_abs_diff_eq!(seg.progress(), 1.0);
    }

    #[test]
    fn test_reverse_linear_segment() {
        let mut t = Trajectory::new(Pose2D::new(1.0, 1.0, PI / 2.0), 0.5).unwrap();
        t.append_linear(2.0, false);
        assert_pose_eq(&t.end_pose(), &Pose2D::new(1.0, -1.0, PI / 2.0));
        t.step();
        assert_abs_diff_eq!(t.current_pose().y(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_length_is_sum_of_segments() {
        let mut t = Trajectory::new(Pose2D::new(3.0, -1.0, 0.3), 1.0).unwrap();
        let lengths = [1.25, 0.5, 7.0, 3.3];
        for (i, l) in lengths.iter().enumerate() {
            if i % 2 == 0 {
                t.append_linear(*l, i % 4 == 0);
            } else {
                t.append_curve(l / 2.0, 2.0, i % 3 == 0);
            }
        }
        assert_abs_diff_eq!(t.length(), lengths.iter().sum::<f64>(), epsilon = 1e-4);
        let sum: f64 = t.segments().iter().map(Segment::length).sum();
        assert_abs_diff_eq!(t.length(), sum, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_last_and_clear() {
        let mut t = mixed();
        let before = t.segments()[2].end_pose();
        t.remove_last();
        assert_eq!(t.segments().len(), 3);
        assert_pose_eq(&t.end_pose(), &before);
        let sum: f64 = t.segments().iter().map(Segment::length).sum();
        assert_abs_diff_eq!(t.length(), sum, epsilon = 1e-12);

        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.length(), 0.0);
        assert_pose_eq(&t.end_pose(), &t.start_pose());
        t.remove_last();
        assert!(t.is_empty());
    }

    #[test]
    fn test_step_carries_overflow_across_segments() {
        let mut t = Trajectory::new(Pose2D::origin(), 1.5).unwrap();
        t.append_linear(1.0, true);
        t.append_linear(1.0, true);
        assert!(!t.step());
        assert_abs_diff_eq!(t.current_pose().x(), 1.5, epsilon = 1e-12);
        assert!(t.step());
        assert_pose_eq(&t.current_pose(), &t.end_pose());
    }

    #[test]
    fn test_step_whole_length_then_finished() {
        let mut t = mixed();
        let total = t.length();
        t.set_step_length(total).unwrap();
        t.step();
        assert_pose_eq(&t.current_pose(), &t.end_pose());
        assert!(t.step());
        assert_pose_eq(&t.current_pose(), &t.end_pose());
        assert!(t.step());
        assert_pose_eq(&t.current_pose(), &t.end_pose());
    }

    #[test]
    fn test_walk_visits_end_pose() {
        let mut t = mixed();
        let mut steps = 0;
        while !t.step() {
            steps += 1;
            assert!(steps < 10_000);
        }
        assert_pose_eq(&t.current_pose(), &t.end_pose());
        t.reset_cursor();
        assert_pose_eq(&t.current_pose(), &t.start_pose());
    }

    #[test]
    fn test_restore_last_step() {
        let mut t = Trajectory::new(Pose2D::origin(), 0.4).unwrap();
        t.append_linear(1.0, true);
        t.append_curve(PI, 1.0, false);
        t.step();
        t.step();
        let before = t.current_pose();
        t.step(); // crosses into the curve
        t.restore_last_step();
        assert_pose_eq(&t.current_pose(), &before);
        t.step();
        assert!(t.current_pose().y() > 0.0);
        // only one level of undo
        let after = t.current_pose();
        t.restore_last_step();
        t.restore_last_step();
        assert_pose_eq(&t.current_pose(), &before);
        t.step();
        assert_pose_eq(&t.current_pose(), &after);
    }

    #[test]
    fn test_truncate_to_cap() {
        for cap in [0.75, 2.55, 4.0, 100.0] {
            let mut t = mixed();
            let original = t.length();
            let outcome = t.truncate(&FreeSpace, Some(cap), 0.1, TruncationPolicy::Reject);
            assert!(outcome.is_accepted());
            assert_abs_diff_eq!(t.length(), cap.min(original), epsilon = 1e-6);
            let sum: f64 = t.segments().iter().map(Segment::length).sum();
            assert_abs_diff_eq!(t.length(), sum, epsilon = 1e-12);
            if cap < original {
                assert_eq!(outcome, TruncationOutcome::Truncated(TruncationCause::LengthCap));
            } else {
                assert_eq!(outcome, TruncationOutcome::Complete);
            }
        }
    }

    #[test]
    fn test_truncate_uncapped_free_space() {
        let mut t = mixed();
        let end = t.end_pose();
        assert_eq!(t.truncate(&FreeSpace, None, 0.1, TruncationPolicy::Reject), TruncationOutcome::Complete);
        assert_pose_eq(&t.end_pose(), &end);
        assert_pose_eq(&t.current_pose(), &t.start_pose());
    }

    #[test]
    fn test_truncate_first_increment_collision() {
        let always = |_: &Pose2D, _: f64| true;
        for policy in [TruncationPolicy::Reject, TruncationPolicy::Chunk] {
            let mut t = mixed();
            let outcome = t.truncate(&always, None, 0.1, policy);
            assert_eq!(outcome, TruncationOutcome::Rejected);
            assert!(outcome.is_truncated());
        }
    }

    #[test]
    fn test_truncate_collision_after_progress() {
        let wall = |pose: &Pose2D, _: f64| pose.x() > 1.0;
        let mut t = Trajectory::new(Pose2D::origin(), 0.1).unwrap();
        t.append_linear(5.0, true);
        assert_eq!(t.truncate(&wall, None, 0.1, TruncationPolicy::Reject), TruncationOutcome::Rejected);

        let mut t = Trajectory::new(Pose2D::origin(), 0.1).unwrap();
        t.append_linear(2.0, true);
        t.append_linear(3.0, true);
        let outcome = t.truncate(&wall, None, 0.1, TruncationPolicy::Chunk);
        assert_eq!(outcome, TruncationOutcome::Truncated(TruncationCause::Collision));
        assert_eq!(t.segments().len(), 1);
        assert!(t.end_pose().x() <= 1.0);
        assert!(t.end_pose().x() > 0.85);
        assert_abs_diff_eq!(t.length(), t.end_pose().x(), epsilon = 1e-9);
    }

    #[test]
    fn test_truncate_checks_final_pose() {
        let at_goal = |pose: &Pose2D, _: f64| pose.x() > 0.99;
        let mut t = Trajectory::new(Pose2D::origin(), 0.3).unwrap();
        t.append_linear(1.0, true);
        assert_eq!(t.truncate(&at_goal, None, 0.1, TruncationPolicy::Reject), TruncationOutcome::Rejected);
    }

    #[test]
    fn test_truncated_curve_keeps_length_invariant() {
        let mut t = Trajectory::new(Pose2D::origin(), 0.1).unwrap();
        t.append_curve(PI, 2.0, false);
        t.truncate(&FreeSpace, Some(1.0), 0.1, TruncationPolicy::Reject);
        match &t.segments()[0] {
            Segment::Curve(c) => {
                assert_abs_diff_eq!(c.length, c.angle.abs() * c.radius, epsilon = 1e-12);
                assert_abs_diff_eq!(c.angle, 0.5, epsilon = 1e-6);
            }
            Segment::Linear(_) => panic!("expected a curve"),
        }
        assert_pose_eq(&t.end_pose(), &t.segments()[0].end_pose());
    }

    #[test]
    fn test_sample_includes_endpoints() {
        let seg = Segment::Curve(CurveSegment::new(Point2D::zeros(), Point2D::x(), PI, 1.0, false));
        let pts = seg.sample(0.5);
        assert_eq!(pts.len(), 8);
        assert_abs_diff_eq!(pts[0].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pts[7].y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_step_length() {
        for bad in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(Trajectory::new(Pose2D::origin(), bad), Err(PlannerError::InvalidParameter(_))));
        }
        let mut t = Trajectory::new(Pose2D::origin(), 0.6).unwrap();
        t.append_linear(1.0, true);
        assert!(t.set_step_length(0.0).is_err());
        assert!(t.set_step_length(-1.0).is_err());
        assert_abs_diff_eq!(t.step_length(), 0.6);
        assert!(!t.step());
        assert!(t.step());
    }
}
