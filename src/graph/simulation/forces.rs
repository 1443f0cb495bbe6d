use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const MIN_DISTANCE_SQ: f32 = 1.0;
const COINCIDENT_SQ: f32 = 1e-6;

fn separation_direction(from: usize, to: usize) -> Vec2 {
    let (low, high, sign) = if from < to {
        (from, to, 1.0)
    } else {
        (to, from, -1.0)
    };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * sign
}

#[derive(Clone, Copy)]
pub(super) struct LinkConstraint {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

pub(super) fn apply_links(
    constraints: &[LinkConstraint],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
) {
    for constraint in constraints {
        let (source, target) = (constraint.source, constraint.target);
        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() < COINCIDENT_SQ {
            delta = separation_direction(target, source) * 1e-3;
        }

        let length = delta.length();
        let scale = (length - distance) / length * alpha * constraint.strength;
        let correction = delta * scale;
        velocities[target] -= correction * constraint.bias;
        velocities[source] += correction * (1.0 - constraint.bias);
    }
}

fn charge_impulse(delta: Vec2, weight: f32) -> Vec2 {
    // Inside one unit the falloff stops growing.
    let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
    delta * (weight / distance_sq)
}

pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength_alpha: f32,
    theta: f32,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            if delta.length_sq() < COINCIDENT_SQ {
                delta = -separation_direction(index, other) * 1e-3;
            }
            *velocity += charge_impulse(delta, strength_alpha);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq().max(COINCIDENT_SQ);
    let side = node.bounds.side_length();
    let can_approximate = !node.bounds.contains(point)
        && (side * side) / distance_sq < theta * theta
        && node.mass > 1.0;

    if can_approximate {
        *velocity += charge_impulse(delta, strength_alpha * node.mass);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, strength_alpha, theta, velocity);
    }
}

pub(super) fn apply_center(
    positions: &mut [Vec2],
    pinned: &[bool],
    center: Vec2,
    strength: f32,
) {
    if positions.is_empty() {
        return;
    }

    let mut centroid = Vec2::ZERO;
    for position in positions.iter() {
        centroid += *position;
    }
    centroid /= positions.len() as f32;

    let shift = (centroid - center) * strength.clamp(0.0, 1.0);
    if !shift.is_finite() || shift.length_sq() <= f32::EPSILON {
        return;
    }
    for (position, is_pinned) in positions.iter_mut().zip(pinned) {
        if !is_pinned {
            *position -= shift;
        }
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_reach_sq: f32,
}

fn resolve_pair(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    impulses: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = predicted[from] - predicted[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    if distance_sq < COINCIDENT_SQ {
        delta = separation_direction(from, to) * 1e-3;
    }

    let distance = delta.length();
    let push = delta * ((reach - distance) / distance * params.strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };
    impulses[from] += push * share;
    impulses[to] -= push * (1.0 - share);
}

pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    impulses: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (position, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[position + 1..] {
                    resolve_pair(from, to, predicted, radii, params, impulses);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_pair(from, to, predicted, radii, params, impulses);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, predicted, radii, params, impulses);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, params, impulses,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, predicted, radii, params, impulses);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, predicted, radii, params, impulses);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separation_directions_oppose() {
        let forward = separation_direction(3, 7);
        let backward = separation_direction(7, 3);
        assert!((forward + backward).length() < 1e-6);
        assert!((forward.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn link_spring_pulls_far_nodes_together() {
        let positions = [vec2(0.0, 0.0), vec2(400.0, 0.0)];
        let mut velocities = [Vec2::ZERO; 2];
        let constraint = LinkConstraint {
            source: 0,
            target: 1,
            strength: 1.0,
            bias: 0.5,
        };
        apply_links(&[constraint], &positions, &mut velocities, 150.0, 0.3);
        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
    }

    #[test]
    fn charge_repels_and_survives_coincidence() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build(&positions).expect("tree builds");
        let mut velocities = [Vec2::ZERO; 3];
        for (index, velocity) in velocities.iter_mut().enumerate() {
            accumulate_charge_for_node(&tree, index, &positions, -400.0 * 0.3, 0.9, velocity);
        }
        assert!(velocities[0].x < 0.0);
        assert!(velocities.iter().all(|velocity| velocity.is_finite()));
        // The coincident pair is split apart rather than left stacked.
        assert!((velocities[1] - velocities[2]).length() > 0.0);
    }

    #[test]
    fn overlapping_circles_get_opposite_impulses() {
        let predicted = vec![vec2(0.0, 0.0), vec2(20.0, 0.0), vec2(500.0, 0.0)];
        let radii = vec![30.0, 30.0, 30.0];
        let tree = QuadNode::build(&predicted).expect("tree builds");
        let mut impulses = vec![Vec2::ZERO; 3];
        accumulate_collision_pairs(
            &tree,
            &tree,
            true,
            &predicted,
            &radii,
            CollisionParams {
                strength: 0.7,
                max_reach_sq: 60.0 * 60.0,
            },
            &mut impulses,
        );
        assert!(impulses[0].x < 0.0);
        assert!(impulses[1].x > 0.0);
        assert_eq!(impulses[2], Vec2::ZERO);
    }

    #[test]
    fn centering_ignores_pinned_nodes() {
        let mut positions = vec![vec2(100.0, 100.0), vec2(300.0, 100.0)];
        apply_center(&mut positions, &[true, false], vec2(0.0, 0.0), 1.0);
        assert_eq!(positions[0], vec2(100.0, 100.0));
        assert_eq!(positions[1], vec2(100.0, 0.0));
    }
}
