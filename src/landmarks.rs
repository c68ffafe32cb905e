use derive_new::new;
use log::debug;

use crate::{Direction, Point};

/// Pool of landmark centroids consumed by a single walk.
#[derive(Clone, Debug, Default, PartialEq, new)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /**
     * Deletes every point strictly closer than `threshold` to `target`.
     */
    pub fn remove_near(&mut self, target: &Point, threshold: f64) {
        let before = self.points.len();
        self.points.retain(|p| p.distance(target) >= threshold);
        let removed = before - self.points.len();
        if removed > 0 {
            debug!("removed {} point(s) near {}", removed, target);
        }
    }

    /**
     * Returns the points ahead of `from` in `direction`, nearest first.
     * Ties keep scan order.
     */
    pub fn nearest_candidates(
        &self,
        from: &Point,
        direction: Direction,
        max_radius: f64,
        alignment_epsilon: f64,
    ) -> Vec<Point> {
        let mut candidates = self
            .points
            .iter()
            .map(|p| (*p, from.distance(p)))
            .filter(|(p, distance)| {
                *distance > 0.0
                    && *distance < max_radius
                    && direction.aligned(from, p, alignment_epsilon)
            })
            .collect::<Vec<(Point, f64)>>();

        // stable, so equal distances stay in scan order
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        candidates.into_iter().map(|(p, _)| p).collect()
    }

    /// Lowest point on the image (largest y); the first one scanned wins ties.
    /// Points with a non-finite coordinate are never picked.
    pub fn lowest(&self) -> Option<Point> {
        let mut lowest: Option<Point> = None;
        for p in self.points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
            match lowest {
                Some(l) if p.y <= l.y => {}
                _ => lowest = Some(*p),
            }
        }
        lowest
    }
}

impl From<Vec<Point>> for LandmarkSet {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
