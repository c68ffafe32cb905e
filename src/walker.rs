use derive_new::new;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Direction, FloorPlan, LandmarkSet, Point, RouteError, Segment};

/// Walk settings. Every field has a default so a partial JSON body is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Points closer than this to the current position count as the same landmark.
    pub merge_threshold: f64,
    /// Allowed perpendicular drift from the corridor line.
    pub alignment_epsilon: f64,
    /// Search radius; half the image height when unset.
    pub max_radius: Option<f64>,
    pub plan: Vec<Direction>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 5.0,
            alignment_epsilon: 40.0,
            max_radius: None,
            plan: vec![Direction::Right, Direction::Top, Direction::Left],
        }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<(), RouteError> {
        if !(self.merge_threshold.is_finite() && self.merge_threshold > 0.0) {
            return Err(RouteError::InvalidConfig("merge_threshold must be positive"));
        }

        if !(self.alignment_epsilon.is_finite() && self.alignment_epsilon > 0.0) {
            return Err(RouteError::InvalidConfig("alignment_epsilon must be positive"));
        }

        if let Some(max_radius) = self.max_radius {
            if !(max_radius.is_finite() && max_radius > 0.0) {
                return Err(RouteError::InvalidConfig("max_radius must be positive"));
            }
        }

        Ok(())
    }

    pub fn step_params(&self, max_radius: f64) -> StepParams {
        StepParams::new(self.merge_threshold, self.alignment_epsilon, max_radius)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct StepParams {
    pub merge_threshold: f64,
    pub alignment_epsilon: f64,
    pub max_radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Advanced(Segment),
    Stalled,
}

/// Current position plus the landmarks not yet visited. Owned by exactly one walk.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkerState {
    position: Point,
    landmarks: LandmarkSet,
}

impl WalkerState {
    /**
     * Starts at the lowest landmark on the image (largest y).
     * Err if there are no landmarks.
     */
    pub fn start(landmarks: LandmarkSet) -> Result<Self, RouteError> {
        let position = landmarks.lowest().ok_or(RouteError::EmptyLandmarkSet)?;
        debug!("start:{} of {} landmarks", position, landmarks.len());
        Ok(Self::at(position, landmarks))
    }

    pub fn at(position: Point, landmarks: LandmarkSet) -> Self {
        Self {
            position,
            landmarks,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn landmarks(&self) -> &LandmarkSet {
        &self.landmarks
    }

    /**
     * Marks the current landmark visited, then moves to the nearest aligned
     * landmark in `direction`. Stalls in place when nothing qualifies.
     */
    pub fn step(mut self, direction: Direction, params: &StepParams) -> (Self, StepOutcome) {
        let from = self.position;
        debug!("current:{} direction:{}", from, direction);

        self.landmarks.remove_near(&from, params.merge_threshold);

        let candidates = self.landmarks.nearest_candidates(
            &from,
            direction,
            params.max_radius,
            params.alignment_epsilon,
        );
        debug!(
            "landmarks:{} candidates:{}",
            self.landmarks.len(),
            candidates.len()
        );

        match candidates.first() {
            Some(next) => {
                debug!("next:{} distance:{}", next, from.distance(next));
                self.position = *next;
                (self, StepOutcome::Advanced(Segment::new(from, *next)))
            }
            None => {
                debug!("stalled at {}", from);
                (self, StepOutcome::Stalled)
            }
        }
    }
}

/// Progress of a [`Walk`]. An empty plan is `Done` from the start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkPhase {
    Idle,
    /// `completed` commands of `of` have run; the next one is at index `completed`.
    Walking { completed: usize, of: usize },
    Done,
}

/// Runs a plan one command at a time, yielding the outcome of each step.
pub struct Walk<'a> {
    state: Option<WalkerState>,
    plan: &'a [Direction],
    params: StepParams,
    next_step: usize,
}

impl<'a> Walk<'a> {
    pub fn new(state: WalkerState, plan: &'a [Direction], params: StepParams) -> Self {
        Self {
            state: Some(state),
            plan,
            params,
            next_step: 0,
        }
    }

    pub fn phase(&self) -> WalkPhase {
        if self.next_step >= self.plan.len() {
            WalkPhase::Done
        } else if self.next_step == 0 {
            WalkPhase::Idle
        } else {
            WalkPhase::Walking {
                completed: self.next_step,
                of: self.plan.len(),
            }
        }
    }

    pub fn into_state(self) -> Option<WalkerState> {
        self.state
    }
}

impl Iterator for Walk<'_> {
    type Item = StepOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let direction = *self.plan.get(self.next_step)?;
        let (state, outcome) = self.state.take()?.step(direction, &self.params);
        self.state = Some(state);
        self.next_step += 1;
        Some(outcome)
    }
}

/// Segments produced by one walk, in order. Stalled commands leave no segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    segments: Vec<Segment>,
    stalled_steps: Vec<usize>,
}

impl Route {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Plan indices whose command found no candidate.
    pub fn stalled_steps(&self) -> &[usize] {
        &self.stalled_steps
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The route as one polyline: first segment start, then every segment end.
    pub fn waypoints(&self) -> Vec<Point> {
        let Some(first) = self.segments.first() else {
            return Vec::new();
        };

        let mut waypoints = Vec::with_capacity(self.segments.len() + 1);
        waypoints.push(first.from);
        waypoints.extend(self.segments.iter().map(|s| s.to));
        waypoints
    }

    fn from_walk(walk: Walk<'_>) -> Self {
        let mut route = Route::default();
        for (i, outcome) in walk.enumerate() {
            match outcome {
                StepOutcome::Advanced(segment) => route.segments.push(segment),
                StepOutcome::Stalled => route.stalled_steps.push(i),
            }
        }
        route
    }
}

#[derive(Clone, Debug, Default, new)]
pub struct RouteWalker {
    config: WalkConfig,
}

impl RouteWalker {
    /**
     * Walks the configured plan over a fresh copy of the floor's landmarks.
     * Err if the config is invalid or the floor has no landmarks.
     */
    pub fn walk(&self, floor: &FloorPlan) -> Result<Route, RouteError> {
        let max_radius = self
            .config
            .max_radius
            .unwrap_or_else(|| floor.default_max_radius());
        self.walk_landmarks(LandmarkSet::from(floor.landmarks.clone()), max_radius)
    }

    pub fn walk_landmarks(
        &self,
        landmarks: LandmarkSet,
        max_radius: f64,
    ) -> Result<Route, RouteError> {
        self.config.validate()?;
        if !(max_radius.is_finite() && max_radius > 0.0) {
            return Err(RouteError::InvalidConfig("max_radius must be positive"));
        }

        let state = WalkerState::start(landmarks)?;
        let walk = Walk::new(state, &self.config.plan, self.config.step_params(max_radius));
        let route = Route::from_walk(walk);

        debug!(
            "route: {} segment(s), {} stall(s)",
            route.len(),
            route.stalled_steps.len()
        );
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StepParams {
        StepParams::new(5.0, 40.0, 600.0)
    }

    fn scenario() -> LandmarkSet {
        LandmarkSet::from(vec![
            Point::new(1200.0, 600.0),
            Point::new(1230.0, 592.0),
            Point::new(1320.0, 588.0),
            Point::new(1100.0, 590.0),
        ])
    }

    #[test]
    fn test_start_picks_lowest() {
        let state = WalkerState::start(scenario()).unwrap();
        assert_eq!(state.position(), Point::new(1200.0, 600.0));
        assert_eq!(state.landmarks().len(), 4);
    }

    #[test]
    fn test_start_empty() {
        let result = WalkerState::start(LandmarkSet::default());
        assert_eq!(result, Err(RouteError::EmptyLandmarkSet));
    }

    #[test]
    fn test_step_right_scenario() {
        let state = WalkerState::start(scenario()).unwrap();

        let (state, outcome) = state.step(Direction::Right, &params());

        assert_eq!(
            outcome,
            StepOutcome::Advanced(Segment::new(
                Point::new(1200.0, 600.0),
                Point::new(1230.0, 592.0)
            ))
        );
        assert_eq!(state.position(), Point::new(1230.0, 592.0));
        assert_eq!(
            state.landmarks().points(),
            &[
                Point::new(1230.0, 592.0),
                Point::new(1320.0, 588.0),
                Point::new(1100.0, 590.0),
            ]
        );
    }

    #[test]
    fn test_step_stall() {
        let landmarks = LandmarkSet::from(vec![Point::new(100.0, 100.0), Point::new(50.0, 90.0)]);
        let state = WalkerState::start(landmarks).unwrap();

        let (state, outcome) = state.step(Direction::Right, &params());

        assert_eq!(outcome, StepOutcome::Stalled);
        assert_eq!(state.position(), Point::new(100.0, 100.0));
        assert_eq!(state.landmarks().points(), &[Point::new(50.0, 90.0)]);
    }

    #[test]
    fn test_walk_phases() {
        let plan = [Direction::Right, Direction::Left];
        let state = WalkerState::start(scenario()).unwrap();
        let mut walk = Walk::new(state, &plan, params());

        assert_eq!(walk.phase(), WalkPhase::Idle);
        assert!(walk.next().is_some());
        assert_eq!(walk.phase(), WalkPhase::Walking { completed: 1, of: 2 });
        assert!(walk.next().is_some());
        assert_eq!(walk.phase(), WalkPhase::Done);
        assert!(walk.next().is_none());
        assert!(walk.into_state().is_some());
    }

    #[test]
    fn test_walk_default_plan() {
        let floor = FloorPlan::new(
            1200,
            1600,
            vec![
                Point::new(1200.0, 600.0),
                Point::new(1230.0, 592.0),
                Point::new(1320.0, 588.0),
                Point::new(1250.0, 400.0),
                Point::new(1100.0, 405.0),
                Point::new(1320.0, 200.0),
            ],
        );
        let walker = RouteWalker::default();

        let route = walker.walk(&floor).unwrap();

        assert_eq!(
            route.waypoints(),
            vec![
                Point::new(1200.0, 600.0),
                Point::new(1230.0, 592.0),
                Point::new(1250.0, 400.0),
                Point::new(1100.0, 405.0),
            ]
        );
        assert!(route.stalled_steps().is_empty());
        // the floor itself is never consumed
        assert_eq!(floor.landmarks.len(), 6);
    }

    #[test]
    fn test_walk_full_plan() {
        let landmarks = LandmarkSet::from(vec![
            Point::new(100.0, 500.0),
            Point::new(300.0, 490.0),
            Point::new(310.0, 300.0),
            Point::new(120.0, 290.0),
            Point::new(320.0, 100.0),
        ]);
        let walker = RouteWalker::default();

        let route = walker.walk_landmarks(landmarks, 250.0).unwrap();

        assert_eq!(
            route.waypoints(),
            vec![
                Point::new(100.0, 500.0),
                Point::new(300.0, 490.0),
                Point::new(310.0, 300.0),
                Point::new(120.0, 290.0),
            ]
        );
        assert!(route.stalled_steps().is_empty());
    }

    #[test]
    fn test_walk_does_not_reselect_visited() {
        let config = WalkConfig {
            plan: vec![Direction::Right, Direction::Left],
            ..WalkConfig::default()
        };
        let landmarks = LandmarkSet::from(vec![Point::new(0.0, 100.0), Point::new(50.0, 100.0)]);

        let route = RouteWalker::new(config)
            .walk_landmarks(landmarks, 300.0)
            .unwrap();

        assert_eq!(route.len(), 1);
        assert_eq!(route.stalled_steps(), &[1]);
    }

    #[test]
    fn test_walk_first_direction_stalls() {
        let config = WalkConfig {
            plan: vec![Direction::Right, Direction::Left],
            ..WalkConfig::default()
        };
        let landmarks = LandmarkSet::from(vec![Point::new(100.0, 100.0), Point::new(50.0, 100.0)]);

        let route = RouteWalker::new(config)
            .walk_landmarks(landmarks, 300.0)
            .unwrap();

        assert_eq!(route.stalled_steps(), &[0]);
        assert_eq!(
            route.segments(),
            &[Segment::new(Point::new(100.0, 100.0), Point::new(50.0, 100.0))]
        );
    }

    #[test]
    fn test_walk_degenerate_input() {
        let landmarks = LandmarkSet::from(vec![
            Point::new(10.0, 10.0),
            Point::new(11.0, 10.0),
            Point::new(10.0, 12.0),
        ]);

        let route = RouteWalker::default()
            .walk_landmarks(landmarks, 300.0)
            .unwrap();

        assert!(route.is_empty());
        assert!(route.waypoints().is_empty());
        assert_eq!(route.stalled_steps(), &[0, 1, 2]);
    }

    #[test]
    fn test_walk_empty() {
        let result = RouteWalker::default().walk(&FloorPlan::new(100, 100, Vec::new()));
        assert_eq!(result, Err(RouteError::EmptyLandmarkSet));
    }

    #[test]
    fn test_walk_empty_plan() {
        let config = WalkConfig {
            plan: Vec::new(),
            ..WalkConfig::default()
        };

        let route = RouteWalker::new(config)
            .walk_landmarks(scenario(), 300.0)
            .unwrap();

        assert!(route.is_empty());
        assert!(route.stalled_steps().is_empty());
    }

    #[test]
    fn test_walk_empty_plan_is_done() {
        let state = WalkerState::start(scenario()).unwrap();
        let mut walk = Walk::new(state, &[], params());

        assert_eq!(walk.phase(), WalkPhase::Done);
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_walk_rejects_bad_radius() {
        for max_radius in [-1.0, 0.0, f64::INFINITY, f64::NAN] {
            let result = RouteWalker::default().walk_landmarks(scenario(), max_radius);
            assert_eq!(
                result,
                Err(RouteError::InvalidConfig("max_radius must be positive"))
            );
        }

        // rows / 2 == 0
        let floor = FloorPlan::new(1, 1600, vec![Point::new(0.0, 10.0), Point::new(10.0, 10.0)]);
        assert_eq!(
            RouteWalker::default().walk(&floor),
            Err(RouteError::InvalidConfig("max_radius must be positive"))
        );
    }

    #[test]
    fn test_validate() {
        assert!(WalkConfig::default().validate().is_ok());

        let bad_epsilon = WalkConfig {
            alignment_epsilon: 0.0,
            ..WalkConfig::default()
        };
        assert!(bad_epsilon.validate().is_err());

        let bad_radius = WalkConfig {
            max_radius: Some(f64::NAN),
            ..WalkConfig::default()
        };
        assert_eq!(
            RouteWalker::new(bad_radius).walk_landmarks(scenario(), 300.0),
            Err(RouteError::InvalidConfig("max_radius must be positive"))
        );
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: WalkConfig =
            serde_json::from_str(r#"{"alignment_epsilon": 25.0, "plan": ["TOP", "RIGHT"]}"#)
                .unwrap();

        assert_eq!(config.merge_threshold, 5.0);
        assert_eq!(config.alignment_epsilon, 25.0);
        assert_eq!(config.max_radius, None);
        assert_eq!(config.plan, vec![Direction::Top, Direction::Right]);
    }
}
