//! Reeds-Shepp RRT
//!
//! Tree of reachable vehicle poses. Every edge is a (possibly truncated)
//! shortest Reeds-Shepp connection that was stepped through the collision
//! oracle before it was accepted. Once a vertex lands close enough to a target
//! configuration and connects to it cleanly, the target's backing maneuvers are
//! spliced on and the tree turns terminal.

use std::f64::consts::TAU;

use log::{debug, info, trace, warn};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Uniform;

use crate::common::{CollisionOracle, MapBounds, PlannerError, PlannerResult, Pose2D};
use crate::path_planning::reeds_shepp_path::{connect, ReedsSheppSolution};
use crate::path_planning::trajectory::{
    Segment, Trajectory, TruncationOutcome, TruncationPolicy, DEFAULT_STEP_SIZE,
};

/// Target pose, optionally chained to a parent configuration by a
/// pre-computed backing maneuver that leads from this pose to the parent's.
#[derive(Debug, Clone)]
pub struct CarConfiguration {
    pub pose: Pose2D,
    pub parent: Option<usize>,
    pub backing: Option<Trajectory>,
}

impl CarConfiguration {
    pub fn root(pose: Pose2D) -> Self {
        CarConfiguration { pose, parent: None, backing: None }
    }

    pub fn chained(pose: Pose2D, parent: usize, backing: Trajectory) -> Self {
        CarConfiguration { pose, parent: Some(parent), backing: Some(backing) }
    }
}

/// Target configurations a tree tries to reach. Parents are indices into
/// the same set.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    configs: Vec<CarConfiguration>,
}

impl TargetSet {
    pub fn new() -> Self {
        TargetSet::default()
    }

    pub fn single(pose: Pose2D) -> Self {
        let mut set = TargetSet::new();
        set.push(CarConfiguration::root(pose));
        set
    }

    /// Add a configuration and return its index.
    pub fn push(&mut self, config: CarConfiguration) -> usize {
        self.configs.push(config);
        self.configs.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&CarConfiguration> {
        self.configs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarConfiguration> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Backing maneuvers from `index` up through its ancestors, in driving order.
    pub fn backing_chain(&self, index: usize) -> Vec<&Trajectory> {
        let mut chain = Vec::new();
        let mut current = self.configs.get(index);
        let mut hops = 0;
        while let Some(config) = current {
            let Some(parent) = config.parent else { break };
            if let Some(backing) = &config.backing {
                chain.push(backing);
            }
            hops += 1;
            if hops > self.configs.len() {
                warn!("target configuration {} has a cyclic parent chain", index);
                break;
            }
            current = self.configs.get(parent);
        }
        chain
    }
}

/// Configuration for the Reeds-Shepp RRT
#[derive(Debug, Clone)]
pub struct RamTreeConfig {
    /// Minimum turning radius of the rear axle center [m]
    pub min_turn_radius: f64,
    /// Length cap for edges grown towards random samples [m]
    pub increment: f64,
    /// Vertices closer than this to a target try to connect to it [m]
    pub target_proximity: f64,
    /// Collision validation increment [m]
    pub step_size: f64,
    /// Footprint inflation passed to the collision oracle [m]
    pub safety_margin: f64,
    /// Step length of the composed trajectory [m]
    pub playback_step: f64,
    /// Truncation policy for edges grown towards random samples
    pub sample_policy: TruncationPolicy,
    /// Fixed seed for reproducible growth, entropy when `None`
    pub seed: Option<u64>,
}

impl Default for RamTreeConfig {
    fn default() -> Self {
        Self {
            min_turn_radius: 3.0,
            increment: 3.0,
            target_proximity: 8.0,
            step_size: DEFAULT_STEP_SIZE,
            safety_margin: 0.1,
            playback_step: 1.0,
            sample_policy: TruncationPolicy::Reject,
            seed: None,
        }
    }
}

impl RamTreeConfig {
    pub fn validate(&self) -> PlannerResult<()> {
        let positive = [
            ("min_turn_radius", self.min_turn_radius),
            ("increment", self.increment),
            ("target_proximity", self.target_proximity),
            ("step_size", self.step_size),
            ("playback_step", self.playback_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !(self.safety_margin.is_finite() && self.safety_margin >= 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "safety_margin must be non-negative, got {}",
                self.safety_margin
            )));
        }
        Ok(())
    }
}

/// Vertex of the tree
#[derive(Debug, Clone)]
pub struct RamTreeVertex {
    pub pose: Pose2D,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Segments leading from the parent's pose to this one
    pub edge: Vec<Segment>,
    pub edge_length: f64,
    pub root_distance: f64,
}

impl RamTreeVertex {
    fn root(pose: Pose2D) -> Self {
        RamTreeVertex {
            pose,
            parent: None,
            children: Vec::new(),
            edge: Vec::new(),
            edge_length: 0.0,
            root_distance: 0.0,
        }
    }
}

/// Cheapest connection from an existing vertex to a query pose
#[derive(Debug, Clone)]
pub struct NearestNode {
    pub source: usize,
    pub solution: ReedsSheppSolution,
    pub length: f64,
}

/// A vertex created by an insertion and how its edge was cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub vertex: usize,
    pub outcome: TruncationOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    /// Root only
    Empty,
    Growing,
    /// A target was reached; the path can be composed
    TargetReached,
}

/// Reeds-Shepp RRT over a borrowed target set
pub struct RamTree<'t> {
    config: RamTreeConfig,
    root_pose: Pose2D,
    vertices: Vec<Option<RamTreeVertex>>,
    targets: &'t TargetSet,
    state: TreeState,
    terminal: Option<usize>,
    rng: StdRng,
}

impl<'t> RamTree<'t> {
    pub const ROOT: usize = 0;

    /// Plant a tree at `root` and immediately try the targets from there.
    pub fn new<O>(root: Pose2D, targets: &'t TargetSet, config: RamTreeConfig, oracle: &O) -> PlannerResult<Self>
    where
        O: CollisionOracle + ?Sized,
    {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut tree = RamTree {
            config,
            root_pose: root,
            vertices: vec![Some(RamTreeVertex::root(root))],
            targets,
            state: TreeState::Empty,
            terminal: None,
            rng,
        };
        tree.check_target(Self::ROOT, oracle);
        Ok(tree)
    }

    pub fn config(&self) -> &RamTreeConfig {
        &self.config
    }

    pub fn state(&self) -> TreeState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == TreeState::TargetReached
    }

    pub fn terminal(&self) -> Option<usize> {
        self.terminal
    }

    pub fn targets(&self) -> &'t TargetSet {
        self.targets
    }

    pub fn root_pose(&self) -> Pose2D {
        self.root_pose
    }

    pub fn vertex(&self, id: usize) -> Option<&RamTreeVertex> {
        self.vertices.get(id).and_then(Option::as_ref)
    }

    /// Live vertices with their ids, in creation order
    pub fn vertices(&self) -> impl Iterator<Item = (usize, &RamTreeVertex)> {
        self.vertices.iter().enumerate().filter_map(|(id, v)| v.as_ref().map(|v| (id, v)))
    }

    pub fn len(&self) -> usize {
        self.vertices.iter().flatten().count()
    }

    /// True while nothing has grown from the root. The root itself always
    /// exists, so `len()` is at least 1 even then.
    pub fn is_empty(&self) -> bool {
        self.state == TreeState::Empty
    }

    /// Every edge segment of the tree
    pub fn edges(&self) -> impl Iterator<Item = &Segment> {
        self.vertices.iter().flatten().flat_map(|v| v.edge.iter())
    }

    /// Switch to another target set. A reached target is forgotten but the
    /// vertices spliced for it stay in the tree.
    pub fn set_targets(&mut self, targets: &'t TargetSet) {
        self.targets = targets;
        self.terminal = None;
        self.refresh_state();
    }

    fn refresh_state(&mut self) {
        self.state = if self.terminal.is_some() {
            TreeState::TargetReached
        } else if self.len() > 1 {
            TreeState::Growing
        } else {
            TreeState::Empty
        };
    }

    /// Vertex with the cheapest Reeds-Shepp connection to `pose`; the first
    /// one wins ties. `None` when no vertex can connect.
    pub fn find_nearest(&self, pose: &Pose2D) -> Option<NearestNode> {
        let radius = self.config.min_turn_radius;
        let mut best: Option<NearestNode> = None;
        for (id, vertex) in self.vertices() {
            let solution = connect(&vertex.pose, pose, radius);
            if solution.is_empty() {
                continue;
            }
            let length = solution.length();
            if best.as_ref().map_or(true, |b| length < b.length) {
                best = Some(NearestNode { source: id, solution, length });
            }
        }
        best
    }

    /// Materialize `nearest` at its source vertex, walk it through the oracle
    /// and attach whatever survives as a new vertex.
    pub fn insert<O>(
        &mut self,
        nearest: &NearestNode,
        max_length: Option<f64>,
        policy: TruncationPolicy,
        oracle: &O,
    ) -> Option<Insertion>
    where
        O: CollisionOracle + ?Sized,
    {
        let source = self.vertex(nearest.source)?.pose;
        let mut trajectory =
            match nearest.solution.to_trajectory(source, self.config.min_turn_radius, self.config.step_size) {
                Ok(t) => t,
                Err(e) => {
                    warn!("edge from vertex {} not materialized: {}", nearest.source, e);
                    return None;
                }
            };
        let outcome = trajectory.truncate(oracle, max_length, self.config.safety_margin, policy);
        if !outcome.is_accepted() {
            trace!("edge from vertex {} rejected", nearest.source);
            return None;
        }
        let vertex = self.attach(nearest.source, &trajectory);
        debug!(
            "vertex {} at ({:.2}, {:.2}) from {} ({:?}, {:.2} m)",
            vertex,
            trajectory.end_pose().x(),
            trajectory.end_pose().y(),
            nearest.source,
            outcome,
            trajectory.length()
        );
        Some(Insertion { vertex, outcome })
    }

    fn attach(&mut self, parent: usize, trajectory: &Trajectory) -> usize {
        let id = self.vertices.len();
        let parent_distance = self.vertex(parent).map_or(0.0, |p| p.root_distance);
        let edge: Vec<Segment> = trajectory.segments().iter().map(Segment::detached).collect();
        let edge_length = trajectory.length();
        self.vertices.push(Some(RamTreeVertex {
            pose: trajectory.end_pose(),
            parent: Some(parent),
            children: Vec::new(),
            edge,
            edge_length,
            root_distance: parent_distance + edge_length,
        }));
        if let Some(Some(p)) = self.vertices.get_mut(parent) {
            p.children.push(id);
        }
        if self.state == TreeState::Empty {
            self.state = TreeState::Growing;
        }
        id
    }

    /// Try to connect `vertex` to every target in proximity. On the first
    /// clean connection the target's backing chain is spliced on and the tree
    /// becomes terminal.
    pub fn check_target<O>(&mut self, vertex: usize, oracle: &O) -> bool
    where
        O: CollisionOracle + ?Sized,
    {
        if self.is_terminal() {
            return false;
        }
        let Some(pose) = self.vertex(vertex).map(|v| v.pose) else {
            return false;
        };
        let targets = self.targets;
        for (index, target) in targets.iter().enumerate() {
            if pose.distance(&target.pose) >= self.config.target_proximity {
                continue;
            }
            let solution = connect(&pose, &target.pose, self.config.min_turn_radius);
            if solution.is_empty() {
                continue;
            }
            let length = solution.length();
            let nearest = NearestNode { source: vertex, solution, length };
            let Some(insertion) = self.insert(&nearest, None, TruncationPolicy::Reject, oracle) else {
                trace!("target {} blocked from vertex {}", index, vertex);
                continue;
            };
            if insertion.outcome != TruncationOutcome::Complete {
                continue;
            }

            let mut terminal = insertion.vertex;
            for backing in targets.backing_chain(index) {
                terminal = self.attach(terminal, backing);
            }
            self.terminal = Some(terminal);
            self.state = TreeState::TargetReached;
            info!(
                "target {} reached from vertex {}, path length {:.2} m",
                index,
                vertex,
                self.vertex(terminal).map_or(0.0, |v| v.root_distance)
            );
            return true;
        }
        false
    }

    /// Grow towards one random pose. Returns `true` when this step made the
    /// tree terminal.
    pub fn sample_step<O, B>(&mut self, oracle: &O, bounds: &B) -> bool
    where
        O: CollisionOracle + ?Sized,
        B: MapBounds + ?Sized,
    {
        if self.is_terminal() {
            return false;
        }
        let area = bounds.bounds();
        let finite = [area.x_min, area.x_max, area.y_min, area.y_max, area.width(), area.height()]
            .iter()
            .all(|v| v.is_finite());
        if !(finite && area.x_min <= area.x_max && area.y_min <= area.y_max) {
            warn!("invalid sampling bounds {:?}", area);
            return false;
        }
        let x = Uniform::new_inclusive(area.x_min, area.x_max).sample(&mut self.rng);
        let y = Uniform::new_inclusive(area.y_min, area.y_max).sample(&mut self.rng);
        let yaw = Uniform::new(0.0, TAU).sample(&mut self.rng);
        let sample = Pose2D::new(x, y, yaw);

        let Some(nearest) = self.find_nearest(&sample) else {
            trace!("no connection to sample ({:.2}, {:.2})", x, y);
            return false;
        };
        let policy = self.config.sample_policy;
        match self.insert(&nearest, Some(self.config.increment), policy, oracle) {
            Some(insertion) => self.check_target(insertion.vertex, oracle),
            None => false,
        }
    }

    /// Sample up to `budget` times, stopping early once terminal. Returns
    /// whether the tree is terminal afterwards.
    pub fn grow<O, B>(&mut self, oracle: &O, bounds: &B, budget: usize) -> bool
    where
        O: CollisionOracle + ?Sized,
        B: MapBounds + ?Sized,
    {
        let mut samples = 0;
        while samples < budget && !self.is_terminal() {
            self.sample_step(oracle, bounds);
            samples += 1;
        }
        debug!("grew for {} samples, {} vertices, state {:?}", samples, self.len(), self.state);
        self.is_terminal()
    }

    /// Vertex ids from the root down to `id`
    pub fn path_to(&self, id: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self.vertex(id).map(|_| id);
        while let Some(v) = current {
            path.push(v);
            current = self.vertex(v).and_then(|vertex| vertex.parent);
        }
        path.reverse();
        path
    }

    /// Rebuild the root-to-terminal path as one trajectory.
    pub fn compose_trajectory(&self) -> PlannerResult<Trajectory> {
        let terminal = self.terminal.ok_or(PlannerError::TargetNotReached)?;
        let mut trajectory = Trajectory::new(self.root_pose, self.config.playback_step)?;
        for id in self.path_to(terminal) {
            if let Some(vertex) = self.vertex(id) {
                for seg in &vertex.edge {
                    trajectory.append_segment(seg);
                }
            }
        }
        Ok(trajectory)
    }

    /// Remove a vertex, handing its children to its parent. Each child's edge
    /// is prefixed with the removed edge so root distances stay valid.
    pub fn remove_vertex(&mut self, id: usize) -> PlannerResult<()> {
        if id == Self::ROOT {
            return Err(PlannerError::RootRemoval);
        }
        let removed = self
            .vertices
            .get_mut(id)
            .and_then(|slot| slot.take())
            .ok_or(PlannerError::UnknownVertex(id))?;
        let parent = removed.parent.unwrap_or(Self::ROOT);

        for &child in &removed.children {
            if let Some(Some(c)) = self.vertices.get_mut(child) {
                c.parent = Some(parent);
                let mut edge = removed.edge.clone();
                edge.append(&mut c.edge);
                c.edge = edge;
                c.edge_length += removed.edge_length;
            }
        }
        if let Some(Some(p)) = self.vertices.get_mut(parent) {
            p.children.retain(|&c| c != id);
            p.children.extend(removed.children.iter().copied());
        }

        if self.terminal == Some(id) {
            self.terminal = None;
        }
        self.refresh_state();
        debug!("removed vertex {}, {} children moved to {}", id, removed.children.len(), parent);
        Ok(())
    }
}
