use std::f32::consts::TAU;

use glam::Vec3;

#[derive(Clone, Copy)]
pub(super) struct PairParams {
    pub(super) charge_strength: f32,
    pub(super) collision_radius: f32,
    pub(super) collision_strength: f32,
    pub(super) min_distance: f32,
    pub(super) alpha: f32,
}

#[derive(Clone, Copy)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

/// Separation direction used when two bodies sit on top of each other.
fn fallback_direction(from: usize, to: usize) -> Vec3 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    Vec3::new(angle.cos(), angle.sin(), 0.0)
}

/// Charge repulsion and collision separation for every unordered pair.
pub(super) fn accumulate_pairwise(positions: &[Vec3], velocities: &mut [Vec3], params: PairParams) {
    let min_distance_sq = params.min_distance * params.min_distance;
    let contact = params.collision_radius * 2.0;

    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let mut delta = positions[j] - positions[i];
            let mut distance_sq = delta.length_squared();
            if distance_sq < min_distance_sq {
                if distance_sq <= f32::EPSILON {
                    delta = fallback_direction(i, j) * params.min_distance;
                }
                distance_sq = min_distance_sq;
            }

            // negative strength pushes i away from j
            let weight = params.charge_strength * params.alpha / distance_sq;
            velocities[i] += delta * weight;
            velocities[j] -= delta * weight;

            let distance = distance_sq.sqrt();
            if distance < contact {
                let overlap = (contact - distance) / distance * params.collision_strength * 0.5;
                velocities[i] -= delta * overlap;
                velocities[j] += delta * overlap;
            }
        }
    }
}

/// Spring pull along every link, looking one step ahead like the velocity it will produce.
pub(super) fn accumulate_links(
    links: &[Link],
    positions: &[Vec3],
    velocities: &mut [Vec3],
    alpha: f32,
    min_distance: f32,
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        if source == target || source >= positions.len() || target >= positions.len() {
            continue;
        }

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        let mut distance = delta.length();
        if distance <= f32::EPSILON {
            delta = fallback_direction(source, target) * min_distance;
            distance = min_distance;
        }

        let pull = (distance - link.distance) / distance * alpha * link.strength;
        let correction = delta * pull;
        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}

/// Shifts free bodies so the centroid of all bodies moves toward the origin by `strength`.
pub(super) fn recenter(positions: &mut [Vec3], free: &[bool], strength: f32) {
    if positions.is_empty() {
        return;
    }

    let centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
    if centroid.length_squared() <= 1e-12 {
        return;
    }

    let shift = centroid * strength;
    for (position, free) in positions.iter_mut().zip(free) {
        if *free {
            *position -= shift;
        }
    }
}
