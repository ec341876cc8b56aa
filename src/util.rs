use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec3;

fn stable_hash<T: Hash>(value: T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn unit_interval(bits: u64) -> f32 {
    ((bits & 0xffff_ffff) as f64 / u32::MAX as f64) as f32
}

/// Deterministic pair in `[-1, 1]` derived from `seed`.
pub fn stable_pair<T: Hash>(seed: T) -> (f32, f32) {
    let hash = stable_hash(seed);
    let x = unit_interval(hash);
    let y = unit_interval(hash >> 32);
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Deterministic point in the `[-1, 1]` cube derived from `seed`.
pub fn stable_triple<T: Hash>(seed: T) -> Vec3 {
    let hash = stable_hash(&seed);
    let (x, y) = stable_pair((hash, 0x9e37_79b9_u32));
    let z = unit_interval(hash) * 2.0 - 1.0;
    Vec3::new(x, y, z)
}
