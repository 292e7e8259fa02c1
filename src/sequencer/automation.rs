//! Parameter automation attached to a clip
//!
//! A curve is a piecewise-linear envelope over clip-relative time. Points stay sorted by
//! time and are always clamped to `[0, clip duration]`.

use serde::{Deserialize, Serialize};

/// Automation point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub time: f64,
    pub value: f64,
}

/// Automation curve for a single named parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationCurve {
    param_name: String,
    points: Vec<AutomationPoint>,
}

impl AutomationCurve {
    pub fn new(param_name: impl Into<String>) -> Self {
        Self {
            param_name: param_name.into(),
            points: Vec::new(),
        }
    }

    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    /// Add a point, clamped to `[0, max_time]`, keeping time order.
    /// Returns the index the point landed at.
    pub fn insert_point(&mut self, time: f64, value: f64, max_time: f64) -> usize {
        let time = clamp_time(time, max_time);

        // Insert after any point with the same time
        let idx = self.points.partition_point(|p| p.time <= time);
        self.points.insert(idx, AutomationPoint { time, value });
        idx
    }

    /// Move an existing point. Returns its new index, `None` if `index` is out of range.
    pub fn move_point(
        &mut self,
        index: usize,
        time: f64,
        value: f64,
        max_time: f64,
    ) -> Option<usize> {
        if index >= self.points.len() {
            return None;
        }
        self.points.remove(index);
        Some(self.insert_point(time, value, max_time))
    }

    /// Remove point at index
    pub fn remove_point(&mut self, index: usize) -> Option<AutomationPoint> {
        if index < self.points.len() {
            Some(self.points.remove(index))
        } else {
            None
        }
    }

    /// Re-clamp every point after the owning clip changed duration
    pub fn clamp_to(&mut self, max_time: f64) {
        for point in &mut self.points {
            point.time = clamp_time(point.time, max_time);
        }
    }

    /// Get value at a clip-relative time
    pub fn value_at(&self, time: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if time <= first.time {
            return Some(first.value);
        }
        if time >= last.time {
            return Some(last.value);
        }

        // first index with p.time > time; 1..len thanks to the checks above
        let idx = self.points.partition_point(|p| p.time <= time);
        let p1 = &self.points[idx - 1];
        let p2 = &self.points[idx];

        let span = p2.time - p1.time;
        if span <= 0.0 {
            return Some(p2.value);
        }
        let t = (time - p1.time) / span;
        Some(p1.value + (p2.value - p1.value) * t)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn clamp_time(time: f64, max_time: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, max_time.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(curve: &AutomationCurve) -> bool {
        curve.points().windows(2).all(|w| w[0].time <= w[1].time)
    }

    #[test]
    fn test_empty_curve_has_no_value() {
        let curve = AutomationCurve::new("cutoff");
        assert!(curve.is_empty());
        assert_eq!(curve.value_at(0.5), None);
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut curve = AutomationCurve::new("cutoff");
        curve.insert_point(1.0, 10.0, 4.0);
        curve.insert_point(0.2, 2.0, 4.0);
        curve.insert_point(3.0, 30.0, 4.0);
        curve.insert_point(0.5, 5.0, 4.0);

        assert_eq!(curve.len(), 4);
        assert!(is_sorted(&curve));
        assert_eq!(curve.points()[0].time, 0.2);
        assert_eq!(curve.points()[3].time, 3.0);
    }

    #[test]
    fn test_insert_clamps_to_clip_range() {
        let mut curve = AutomationCurve::new("amp");
        curve.insert_point(-1.0, 0.0, 2.0);
        curve.insert_point(5.0, 1.0, 2.0);

        assert_eq!(curve.points()[0].time, 0.0);
        assert_eq!(curve.points()[1].time, 2.0);
    }

    #[test]
    fn test_move_point_reclamps_and_resorts() {
        let mut curve = AutomationCurve::new("amp");
        curve.insert_point(0.0, 0.0, 2.0);
        curve.insert_point(1.0, 1.0, 2.0);
        curve.insert_point(2.0, 2.0, 2.0);

        let new_index = curve.move_point(0, 10.0, 9.0, 2.0);
        assert_eq!(new_index, Some(2));
        assert!(is_sorted(&curve));
        assert_eq!(curve.points()[2].time, 2.0);
        assert_eq!(curve.points()[2].value, 9.0);

        assert_eq!(curve.move_point(7, 0.0, 0.0, 2.0), None);
    }

    #[test]
    fn test_value_at_interpolates_linearly() {
        let mut curve = AutomationCurve::new("cutoff");
        curve.insert_point(1.0, 100.0, 4.0);
        curve.insert_point(3.0, 300.0, 4.0);

        assert_eq!(curve.value_at(0.0), Some(100.0));
        assert_eq!(curve.value_at(1.0), Some(100.0));
        assert_eq!(curve.value_at(2.0), Some(200.0));
        assert_eq!(curve.value_at(2.5), Some(250.0));
        assert_eq!(curve.value_at(3.0), Some(300.0));
        assert_eq!(curve.value_at(10.0), Some(300.0));
    }

    #[test]
    fn test_value_at_single_point() {
        let mut curve = AutomationCurve::new("amp");
        curve.insert_point(1.0, 0.7, 4.0);
        assert_eq!(curve.value_at(0.0), Some(0.7));
        assert_eq!(curve.value_at(3.0), Some(0.7));
    }

    #[test]
    fn test_clamp_to_shorter_duration() {
        let mut curve = AutomationCurve::new("amp");
        curve.insert_point(0.5, 0.1, 4.0);
        curve.insert_point(3.5, 0.9, 4.0);

        curve.clamp_to(2.0);
        assert_eq!(curve.points()[1].time, 2.0);
        assert!(is_sorted(&curve));
    }

    #[test]
    fn test_remove_point() {
        let mut curve = AutomationCurve::new("amp");
        curve.insert_point(0.5, 0.1, 4.0);
        assert!(curve.remove_point(3).is_none());
        assert!(curve.remove_point(0).is_some());
        assert!(curve.is_empty());
    }
}
