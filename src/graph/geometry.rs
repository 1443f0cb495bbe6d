use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};

use crate::flow::{Element, Flow};

pub const TOTAL_SHIFT: f32 = 15.0;
pub const RADIUS_RANGE: (f32, f32) = (25.0, 45.0);

const MIN_DISTANCE: f32 = 1e-3;
const CURVE_SAMPLES: usize = 16;

/// Perpendicular offset of one member of a parallel bundle. Offsets of a
/// bundle are evenly spaced and sum to zero.
pub fn parallel_offset(index: usize, total: usize, total_shift: f32) -> f32 {
    if total <= 1 {
        return 0.0;
    }
    (index as f32 - (total as f32 - 1.0) / 2.0) * total_shift / total as f32
}

fn direction_or(delta: Vec2, fallback: Vec2) -> Vec2 {
    let length = delta.length();
    if length.is_finite() && length > MIN_DISTANCE {
        delta / length
    } else {
        fallback
    }
}

pub fn usage_counts(elements: &[Element], flows: &[Flow]) -> HashMap<String, usize> {
    let mut counts = elements
        .iter()
        .map(|element| (element.id.clone(), 0usize))
        .collect::<HashMap<_, _>>();

    for flow in flows {
        let mentioned = flow.methods.iter().flatten().collect::<HashSet<_>>();
        for id in mentioned {
            if let Some(count) = counts.get_mut(id) {
                *count += 1;
            }
        }
    }
    counts
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusScale {
    min_usage: usize,
    max_usage: usize,
    range: (f32, f32),
}

impl Default for RadiusScale {
    fn default() -> Self {
        Self {
            min_usage: 0,
            max_usage: 0,
            range: RADIUS_RANGE,
        }
    }
}

impl RadiusScale {
    pub fn from_usage(counts: impl IntoIterator<Item = usize>, range: (f32, f32)) -> Self {
        let mut min_usage = usize::MAX;
        let mut max_usage = 0usize;
        for count in counts {
            min_usage = min_usage.min(count);
            max_usage = max_usage.max(count);
        }
        if min_usage == usize::MAX {
            min_usage = 0;
        }

        Self {
            min_usage,
            max_usage,
            range,
        }
    }

    pub fn radius(&self, usage: usize) -> f32 {
        let (low, high) = self.range;
        if self.max_usage <= self.min_usage {
            return low;
        }

        let span = (self.max_usage as f32).sqrt() - (self.min_usage as f32).sqrt();
        let t = ((usage as f32).sqrt() - (self.min_usage as f32).sqrt()) / span;
        low + (high - low) * t.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgePath {
    Line { from: Vec2, to: Vec2 },
    Quadratic { from: Vec2, control: Vec2, to: Vec2 },
    Loop { center: Vec2, radius: f32 },
}

#[derive(Clone, Copy, Debug)]
pub struct EdgeSpec {
    pub source: Vec2,
    pub target: Vec2,
    pub source_radius: f32,
    pub target_radius: f32,
    pub parallel_index: usize,
    pub parallel_total: usize,
    pub reversed: bool,
    pub self_loop: bool,
}

pub fn edge_path(spec: &EdgeSpec, total_shift: f32) -> EdgePath {
    if spec.self_loop {
        let loop_radius = spec.source_radius * 0.45 + spec.parallel_index as f32 * 5.0;
        return EdgePath::Loop {
            center: spec.source - vec2(0.0, spec.source_radius + loop_radius * 0.6),
            radius: loop_radius,
        };
    }

    let delta = spec.target - spec.source;
    let distance = delta.length().max(MIN_DISTANCE);
    let direction = direction_or(delta, vec2(1.0, 0.0));

    if spec.parallel_total <= 1 {
        let (source_trim, target_trim) = fit_trims(distance, spec.source_radius, spec.target_radius);
        return EdgePath::Line {
            from: spec.source + direction * source_trim,
            to: spec.target - direction * target_trim,
        };
    }

    // The normal follows the canonical pair orientation so members running
    // in opposite directions still fan out on opposite sides.
    let canonical = if spec.reversed { -direction } else { direction };
    let normal = vec2(-canonical.y, canonical.x);
    let offset = parallel_offset(spec.parallel_index, spec.parallel_total, total_shift);
    let midpoint = spec.source + delta * 0.5;
    // A quadratic passes through its chord midpoint plus half the control
    // displacement, so doubling puts the curve apex at `offset`.
    let control = midpoint + normal * (offset * 2.0);

    let (source_trim, target_trim) = fit_trims(distance, spec.source_radius, spec.target_radius);
    let start_direction = direction_or(control - spec.source, direction);
    let end_direction = direction_or(control - spec.target, -direction);

    EdgePath::Quadratic {
        from: spec.source + start_direction * source_trim,
        control,
        to: spec.target + end_direction * target_trim,
    }
}

fn fit_trims(distance: f32, source_radius: f32, target_radius: f32) -> (f32, f32) {
    let total = source_radius.max(0.0) + target_radius.max(0.0);
    if total <= distance || total <= 0.0 {
        return (source_radius.max(0.0), target_radius.max(0.0));
    }
    let scale = distance / total;
    (source_radius.max(0.0) * scale, target_radius.max(0.0) * scale)
}

fn quadratic_point(from: Vec2, control: Vec2, to: Vec2, t: f32) -> Vec2 {
    let inverse = 1.0 - t;
    from * (inverse * inverse) + control * (2.0 * inverse * t) + to * (t * t)
}

fn segment_distance(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= MIN_DISTANCE * MIN_DISTANCE {
        return (point - start).length();
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    (point - (start + segment * t)).length()
}

impl EdgePath {
    pub fn is_finite(&self) -> bool {
        match *self {
            Self::Line { from, to } => from.is_finite() && to.is_finite(),
            Self::Quadratic { from, control, to } => {
                from.is_finite() && control.is_finite() && to.is_finite()
            }
            Self::Loop { center, radius } => center.is_finite() && radius.is_finite(),
        }
    }

    pub fn arrow_tip(&self) -> (Vec2, Vec2) {
        match *self {
            Self::Line { from, to } => (to, direction_or(to - from, vec2(1.0, 0.0))),
            Self::Quadratic { control, to, .. } => {
                (to, direction_or(to - control, vec2(1.0, 0.0)))
            }
            Self::Loop { center, radius } => {
                let angle = std::f32::consts::FRAC_PI_4;
                let tip = center + vec2(angle.cos(), angle.sin()) * radius;
                (tip, vec2(-angle.sin(), angle.cos()))
            }
        }
    }

    pub fn points(&self) -> Vec<Vec2> {
        match *self {
            Self::Line { from, to } => vec![from, to],
            Self::Quadratic { from, control, to } => (0..=CURVE_SAMPLES)
                .map(|step| quadratic_point(from, control, to, step as f32 / CURVE_SAMPLES as f32))
                .collect(),
            Self::Loop { center, radius } => (0..=CURVE_SAMPLES * 2)
                .map(|step| {
                    let angle = step as f32 / (CURVE_SAMPLES * 2) as f32 * std::f32::consts::TAU;
                    center + vec2(angle.cos(), angle.sin()) * radius
                })
                .collect(),
        }
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        match *self {
            Self::Line { from, to } => segment_distance(point, from, to),
            Self::Loop { center, radius } => ((point - center).length() - radius).abs(),
            Self::Quadratic { .. } => self
                .points()
                .windows(2)
                .map(|pair| segment_distance(point, pair[0], pair[1]))
                .fold(f32::INFINITY, f32::min),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn spec(source: Vec2, target: Vec2, index: usize, total: usize, reversed: bool) -> EdgeSpec {
        EdgeSpec {
            source,
            target,
            source_radius: 25.0,
            target_radius: 35.0,
            parallel_index: index,
            parallel_total: total,
            reversed,
            self_loop: false,
        }
    }

    #[test]
    fn offsets_fan_out_symmetrically() {
        for total in 1..8 {
            let offsets = (0..total)
                .map(|index| parallel_offset(index, total, TOTAL_SHIFT))
                .collect::<Vec<_>>();
            let sum = offsets.iter().sum::<f32>();
            assert!(sum.abs() < 1e-4, "offsets {offsets:?} do not cancel");
            for pair in offsets.windows(2) {
                assert!(pair[1] > pair[0] || total == 1);
            }
        }
        assert_eq!(parallel_offset(0, 1, TOTAL_SHIFT), 0.0);
        assert_eq!(parallel_offset(0, 2, TOTAL_SHIFT), -3.75);
        assert_eq!(parallel_offset(1, 2, TOTAL_SHIFT), 3.75);
    }

    #[test]
    fn singleton_edges_are_trimmed_straight_lines() {
        let path = edge_path(&spec(vec2(0.0, 0.0), vec2(100.0, 0.0), 0, 1, false), TOTAL_SHIFT);
        assert_eq!(
            path,
            EdgePath::Line {
                from: vec2(25.0, 0.0),
                to: vec2(65.0, 0.0)
            }
        );
    }

    #[test]
    fn opposite_members_curve_to_opposite_sides() {
        let a = vec2(0.0, 0.0);
        let b = vec2(200.0, 0.0);
        let forward = edge_path(&spec(a, b, 0, 2, false), TOTAL_SHIFT);
        let backward = edge_path(&spec(b, a, 1, 2, true), TOTAL_SHIFT);

        let (EdgePath::Quadratic { control: c0, .. }, EdgePath::Quadratic { control: c1, .. }) =
            (forward, backward)
        else {
            panic!("parallel edges must be curves");
        };
        assert!(c0.y * c1.y < 0.0, "controls {c0:?} and {c1:?} share a side");
        assert!((c0.y + c1.y).abs() < 1e-4);
    }

    #[test]
    fn curve_endpoints_land_on_circle_boundaries() {
        let source = vec2(10.0, 20.0);
        let target = vec2(150.0, 90.0);
        let path = edge_path(&spec(source, target, 2, 3, false), TOTAL_SHIFT);
        let EdgePath::Quadratic { from, to, .. } = path else {
            panic!("expected curve");
        };
        assert!(((from - source).length() - 25.0).abs() < 1e-3);
        assert!(((to - target).length() - 35.0).abs() < 1e-3);
    }

    #[test]
    fn coincident_nodes_stay_finite() {
        let point = vec2(5.0, 5.0);
        for total in 1..4 {
            for index in 0..total {
                let path = edge_path(&spec(point, point, index, total, index % 2 == 1), TOTAL_SHIFT);
                assert!(path.is_finite(), "{path:?}");
                assert!(path.arrow_tip().1.is_finite());
            }
        }
    }

    #[test]
    fn self_loops_sit_above_the_node() {
        let mut loop_spec = spec(vec2(0.0, 0.0), vec2(0.0, 0.0), 0, 1, false);
        loop_spec.self_loop = true;
        let EdgePath::Loop { center, radius } = edge_path(&loop_spec, TOTAL_SHIFT) else {
            panic!("expected loop");
        };
        assert!(center.y < 0.0);
        assert!(radius > 0.0);
    }

    #[test]
    fn equal_usage_maps_to_lower_bound() {
        let scale = RadiusScale::from_usage([2, 2, 2], RADIUS_RANGE);
        assert_eq!(scale.radius(2), 25.0);
        let empty = RadiusScale::from_usage(std::iter::empty(), RADIUS_RANGE);
        assert_eq!(empty.radius(0), 25.0);
    }

    #[test]
    fn usage_counts_distinct_flows_not_links() {
        let now = chrono::Utc::now();
        let elements = ["a", "b", "c"]
            .iter()
            .map(|id| Element {
                id: (*id).to_owned(),
                name: (*id).to_owned(),
                is_buggy: false,
                bug_details: String::new(),
                media_link: None,
                created_at: now,
            })
            .collect::<Vec<_>>();
        let flows = vec![
            Flow {
                id: "f1".to_owned(),
                name: "F1".to_owned(),
                group: None,
                methods: vec![
                    vec!["a".to_owned(), "b".to_owned(), "a".to_owned()],
                    vec!["a".to_owned()],
                ],
            },
            Flow {
                id: "f2".to_owned(),
                name: "F2".to_owned(),
                group: None,
                methods: vec![vec!["a".to_owned(), "ghost".to_owned()]],
            },
        ];

        let counts = usage_counts(&elements, &flows);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.get("c"), Some(&0));
        assert!(!counts.contains_key("ghost"));
    }

    #[test]
    fn hit_distance_follows_the_curve() {
        let path = EdgePath::Quadratic {
            from: vec2(0.0, 0.0),
            control: vec2(50.0, 40.0),
            to: vec2(100.0, 0.0),
        };
        // Apex of the curve sits at half the control height.
        assert!(path.distance_to(vec2(50.0, 20.0)) < 0.5);
        assert!(path.distance_to(vec2(50.0, 0.0)) > 15.0);
    }

    proptest! {
        #[test]
        fn radius_is_monotonic_in_usage(
            counts in prop::collection::vec(0usize..40, 1..30),
            a in 0usize..40,
            b in 0usize..40,
        ) {
            let scale = RadiusScale::from_usage(counts.iter().copied(), RADIUS_RANGE);
            let (fewer, more) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(scale.radius(fewer) <= scale.radius(more));
            prop_assert!(scale.radius(more) <= RADIUS_RANGE.1);
            prop_assert!(scale.radius(fewer) >= RADIUS_RANGE.0);
        }

        #[test]
        fn edge_paths_are_always_finite(
            sx in -1000.0f32..1000.0,
            sy in -1000.0f32..1000.0,
            dx in -2.0f32..2.0,
            dy in -2.0f32..2.0,
            total in 1usize..6,
            reversed in any::<bool>(),
        ) {
            let source = vec2(sx, sy);
            let target = source + vec2(dx, dy);
            for index in 0..total {
                let path = edge_path(&spec(source, target, index, total, reversed), TOTAL_SHIFT);
                prop_assert!(path.is_finite());
                prop_assert!(path.distance_to(source).is_finite());
            }
        }
    }
}
