//! Reeds-Shepp path family
//!
//! Closed-form shortest connections between two poses for a car that can drive
//! forward and backward with a bounded turning radius. Every word of the
//! catalog is solved in unit-radius coordinates and evaluated under the four
//! symmetries (time flip, reflection, both); the cheapest feasible candidate
//! wins.

use std::f64::consts::PI;

use ordered_float::OrderedFloat;

use crate::common::{PlannerResult, Point2D, Pose2D};
use crate::path_planning::trajectory::Trajectory;
use crate::utils::geometry::{angle_between, clamp_unit, polar, reduce_angle, rotate_vector};

/// Elements shorter than this are dropped from a word
const DEGENERATE_LENGTH: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steering {
    Left,
    Right,
}

impl Steering {
    pub fn sign(self) -> f64 {
        match self {
            Steering::Left => 1.0,
            Steering::Right => -1.0,
        }
    }

    fn flipped(self) -> Self {
        match self {
            Steering::Left => Steering::Right,
            Steering::Right => Steering::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gear {
    Forward,
    Backward,
}

impl Gear {
    pub fn sign(self) -> f64 {
        match self {
            Gear::Forward => 1.0,
            Gear::Backward => -1.0,
        }
    }

    fn flipped(self) -> Self {
        match self {
            Gear::Forward => Gear::Backward,
            Gear::Backward => Gear::Forward,
        }
    }
}

/// One primitive of a Reeds-Shepp word
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathElem {
    pub is_curve: bool,
    /// Swept angle magnitude for curves, zero for straights
    pub arc: f64,
    pub length: f64,
    pub steering: Steering,
    pub gear: Gear,
}

impl PathElem {
    pub fn curve(arc: f64, steering: Steering, gear: Gear, radius: f64) -> Self {
        PathElem { is_curve: true, arc, length: arc.abs() * radius, steering, gear }
    }

    pub fn straight(length: f64, gear: Gear) -> Self {
        PathElem { is_curve: false, arc: 0.0, length, steering: Steering::Left, gear }
    }

    /// Same element driven in the opposite gear
    pub fn reversed(&self) -> Self {
        PathElem { gear: self.gear.flipped(), ..*self }
    }

    /// Same element with the opposite steering
    pub fn mirrored(&self) -> Self {
        PathElem { steering: self.steering.flipped(), ..*self }
    }

    /// Signed heading change of a curve, counter-clockwise positive
    pub fn signed_angle(&self) -> f64 {
        self.arc * self.steering.sign() * self.gear.sign()
    }
}

/// Ordered elements of a connection. Empty means no connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReedsSheppSolution {
    elems: Vec<PathElem>,
}

impl ReedsSheppSolution {
    pub fn new(elems: Vec<PathElem>) -> Self {
        ReedsSheppSolution { elems }
    }

    pub fn empty() -> Self {
        ReedsSheppSolution::default()
    }

    pub fn elems(&self) -> &[PathElem] {
        &self.elems
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.elems.iter().map(|e| e.length).sum()
    }

    pub fn reversed(&self) -> Self {
        ReedsSheppSolution::new(self.elems.iter().map(PathElem::reversed).collect())
    }

    pub fn mirrored(&self) -> Self {
        ReedsSheppSolution::new(self.elems.iter().map(PathElem::mirrored).collect())
    }

    /// Append the elements to `trajectory` as linear and curve segments.
    pub fn append_to(&self, trajectory: &mut Trajectory, radius: f64) {
        for e in &self.elems {
            if e.is_curve {
                trajectory.append_curve(e.signed_angle(), radius, e.steering == Steering::Right);
            } else {
                trajectory.append_linear(e.length, e.gear == Gear::Forward);
            }
        }
    }

    /// Materialize as a trajectory starting at `start`.
    pub fn to_trajectory(&self, start: Pose2D, radius: f64, step_length: f64) -> PlannerResult<Trajectory> {
        let mut trajectory = Trajectory::new(start, step_length)?;
        self.append_to(&mut trajectory, radius);
        Ok(trajectory)
    }
}

/// The four symmetries every word is evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    Identity,
    /// Query (-x, y, -phi), answer driven in reverse gear
    TimeFlip,
    /// Query (x, -y, -phi), answer with swapped steering
    Reflect,
    /// Query (-x, -y, phi), both of the above
    TimeFlipReflect,
}

impl Transform {
    pub const ALL: [Transform; 4] =
        [Transform::Identity, Transform::TimeFlip, Transform::Reflect, Transform::TimeFlipReflect];

    fn query(self, x: f64, y: f64, phi: f64) -> (f64, f64, f64) {
        match self {
            Transform::Identity => (x, y, phi),
            Transform::TimeFlip => (-x, y, -phi),
            Transform::Reflect => (x, -y, -phi),
            Transform::TimeFlipReflect => (-x, -y, phi),
        }
    }

    fn restore(self, solution: ReedsSheppSolution) -> ReedsSheppSolution {
        match self {
            Transform::Identity => solution,
            Transform::TimeFlip => solution.reversed(),
            Transform::Reflect => solution.mirrored(),
            Transform::TimeFlipReflect => solution.reversed().mirrored(),
        }
    }
}

/// Unit-radius word output: signed lengths (negative = backward) and the
/// primitive kind of each, `L`, `R` or `S`.
struct RawWord {
    lengths: Vec<f64>,
    kinds: &'static str,
}

type WordFn = fn(f64, f64, f64) -> Option<RawWord>;

fn raw(lengths: Vec<f64>, kinds: &'static str) -> Option<RawWord> {
    Some(RawWord { lengths, kinds })
}

fn left_straight_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u, t) = polar(&Point2D::new(x - phi.sin(), y - 1.0 + phi.cos()));
    let v = reduce_angle(phi - t);
    raw(vec![t, u, v], "LSL")
}

fn left_straight_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, t1) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    let u1_sq = u1 * u1;
    if u1_sq < 4.0 {
        return None;
    }
    let u = (u1_sq - 4.0).sqrt();
    let t = reduce_angle(t1 + 2.0_f64.atan2(u));
    let v = reduce_angle(t - phi);
    raw(vec![t, u, v], "LSR")
}

/// Shared geometry of the three-arc words
fn ccc_polar(x: f64, y: f64, phi: f64) -> Option<(f64, f64)> {
    let (u1, theta) = polar(&Point2D::new(x - phi.sin(), y - 1.0 + phi.cos()));
    if u1 > 4.0 {
        return None;
    }
    Some((u1, theta))
}

fn left_x_right_x_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = ccc_polar(x, y, phi)?;
    let a = clamp_unit(0.25 * u1).acos();
    let t = reduce_angle(theta + PI / 2.0 + a);
    let u = reduce_angle(PI - 2.0 * a);
    let v = reduce_angle(phi - t - u);
    raw(vec![t, -u, v], "LRL")
}

fn left_x_right_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = ccc_polar(x, y, phi)?;
    let a = clamp_unit(0.25 * u1).acos();
    let t = reduce_angle(theta + PI / 2.0 + a);
    let u = reduce_angle(PI - 2.0 * a);
    let v = reduce_angle(t + u - phi);
    raw(vec![t, -u, -v], "LRL")
}

fn left_right_x_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = ccc_polar(x, y, phi)?;
    if u1 < DEGENERATE_LENGTH {
        return None;
    }
    let u = clamp_unit(1.0 - u1 * u1 * 0.125).acos();
    let a = clamp_unit(2.0 * u.sin() / u1).asin();
    let t = reduce_angle(theta + PI / 2.0 - a);
    let v = reduce_angle(t - u - phi);
    raw(vec![t, u, -v], "LRL")
}

fn left_right_x_left_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    if u1 > 2.0 {
        return None;
    }
    let a = clamp_unit((u1 + 2.0) * 0.25).acos();
    let t = reduce_angle(theta + a + PI / 2.0);
    let u = reduce_angle(a);
    let v = reduce_angle(phi - t + 2.0 * u);
    if t >= 0.0 && u >= 0.0 && v >= 0.0 {
        return raw(vec![t, u, -u, -v], "LRLR");
    }
    None
}

fn left_x_right_left_x_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    let u2 = (20.0 - u1 * u1) / 16.0;
    if !(0.0..=1.0).contains(&u2) {
        return None;
    }
    let u = u2.acos();
    let a = clamp_unit(2.0 * u.sin() / u1).asin();
    let t = reduce_angle(theta + a + PI / 2.0);
    let v = reduce_angle(t - phi);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, -u, -u, v], "LRLR");
    }
    None
}

fn left_x_right90_straight_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x - phi.sin(), y - 1.0 + phi.cos()));
    if u1 < 2.0 {
        return None;
    }
    let u = (u1 * u1 - 4.0).sqrt() - 2.0;
    let a = 2.0_f64.atan2((u1 * u1 - 4.0).sqrt());
    let t = reduce_angle(theta + a + PI / 2.0);
    let v = reduce_angle(t - phi + PI / 2.0);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, -PI / 2.0, -u, -v], "LRSL");
    }
    None
}

fn left_straight_right90_x_left(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x - phi.sin(), y - 1.0 + phi.cos()));
    if u1 < 2.0 {
        return None;
    }
    let u = (u1 * u1 - 4.0).sqrt() - 2.0;
    let a = (u1 * u1 - 4.0).sqrt().atan2(2.0);
    let t = reduce_angle(theta - a + PI / 2.0);
    let v = reduce_angle(t - phi - PI / 2.0);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, u, PI / 2.0, -v], "LSRL");
    }
    None
}

fn left_x_right90_straight_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    if u1 < 2.0 {
        return None;
    }
    let t = reduce_angle(theta + PI / 2.0);
    let u = u1 - 2.0;
    let v = reduce_angle(phi - t - PI / 2.0);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, -PI / 2.0, -u, -v], "LRSR");
    }
    None
}

fn left_straight_left90_x_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    if u1 < 2.0 {
        return None;
    }
    let t = reduce_angle(theta);
    let u = u1 - 2.0;
    let v = reduce_angle(phi - t - PI / 2.0);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, u, PI / 2.0, -v], "LSLR");
    }
    None
}

fn left_x_right90_straight_left90_x_right(x: f64, y: f64, phi: f64) -> Option<RawWord> {
    let (u1, theta) = polar(&Point2D::new(x + phi.sin(), y - 1.0 - phi.cos()));
    if u1 < 4.0 {
        return None;
    }
    let u = (u1 * u1 - 4.0).sqrt() - 4.0;
    let a = 2.0_f64.atan2((u1 * u1 - 4.0).sqrt());
    let t = reduce_angle(theta + a + PI / 2.0);
    let v = reduce_angle(t - phi);
    if t >= 0.0 && v >= 0.0 {
        return raw(vec![t, -PI / 2.0, -u, -PI / 2.0, v], "LRSLR");
    }
    None
}

/// Every word, by name
static CATALOG: [(&str, WordFn); 12] = [
    ("LSL", left_straight_left),
    ("LSR", left_straight_right),
    ("L|R|L", left_x_right_x_left),
    ("L|RL", left_x_right_left),
    ("LR|L", left_right_x_left),
    ("LR|LR", left_right_x_left_right),
    ("L|RL|R", left_x_right_left_x_right),
    ("L|R90SL", left_x_right90_straight_left),
    ("LSR90|L", left_straight_right90_x_left),
    ("L|R90SR", left_x_right90_straight_right),
    ("LSL90|R", left_straight_left90_x_right),
    ("L|R90SL90|R", left_x_right90_straight_left90_x_right),
];

pub fn word_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

/// Scale a unit-radius word to `radius`, dropping degenerate elements.
fn scale_word(word: RawWord, radius: f64) -> Option<ReedsSheppSolution> {
    if word.lengths.iter().any(|l| !l.is_finite()) {
        return None;
    }
    let mut elems: Vec<PathElem> = word
        .lengths
        .iter()
        .zip(word.kinds.chars())
        .map(|(&l, kind)| {
            let gear = if l >= 0.0 { Gear::Forward } else { Gear::Backward };
            match kind {
                'S' => PathElem::straight(l.abs() * radius, gear),
                'L' => PathElem::curve(l.abs(), Steering::Left, gear, radius),
                _ => PathElem::curve(l.abs(), Steering::Right, gear, radius),
            }
        })
        .filter(|e| e.length > DEGENERATE_LENGTH)
        .collect();
    if elems.is_empty() {
        // start and goal coincide
        elems.push(PathElem::straight(0.0, Gear::Forward));
    }
    Some(ReedsSheppSolution::new(elems))
}

/// A feasible word evaluation
#[derive(Debug, Clone)]
pub struct Candidate {
    pub word: &'static str,
    pub transform: Transform,
    pub solution: ReedsSheppSolution,
}

/// All feasible candidates for reaching `(x, y)` with relative heading `phi`,
/// expressed in the start pose's frame.
pub fn candidates(x: f64, y: f64, phi: f64, radius: f64) -> Vec<Candidate> {
    if !(radius > 0.0) || !x.is_finite() || !y.is_finite() || !phi.is_finite() {
        return Vec::new();
    }
    let (ux, uy) = (x / radius, y / radius);
    let mut found = Vec::new();
    for &(word, f) in CATALOG.iter() {
        for transform in Transform::ALL {
            let (qx, qy, qphi) = transform.query(ux, uy, phi);
            if let Some(solution) = f(qx, qy, qphi).and_then(|w| scale_word(w, radius)) {
                found.push(Candidate { word, transform, solution: transform.restore(solution) });
            }
        }
    }
    found
}

/// First candidate of minimal total length; empty when nothing is feasible.
pub fn select_min<I>(candidates: I) -> ReedsSheppSolution
where
    I: IntoIterator<Item = ReedsSheppSolution>,
{
    candidates
        .into_iter()
        .filter(|s| !s.is_empty())
        .min_by_key(|s| OrderedFloat(s.length()))
        .unwrap_or_default()
}

/// Shortest connection in the start pose's frame.
pub fn shortest_path(x: f64, y: f64, phi: f64, radius: f64) -> ReedsSheppSolution {
    select_min(candidates(x, y, phi, radius).into_iter().map(|c| c.solution))
}

/// Express `to` in the frame of `from`: local offset and relative heading.
pub fn relative_query(from: &Pose2D, to: &Pose2D) -> (f64, f64, f64) {
    let to_local = angle_between(&from.heading, &Point2D::x());
    let local = rotate_vector(&(to.position - from.position), to_local);
    (local.x, local.y, angle_between(&from.heading, &to.heading))
}

/// Shortest connection between two global poses
pub fn connect(from: &Pose2D, to: &Pose2D, radius: f64) -> ReedsSheppSolution {
    let (x, y, phi) = relative_query(from, to);
    shortest_path(x, y, phi, radius)
}
