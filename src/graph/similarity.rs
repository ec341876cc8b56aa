/// Cosine similarity of two unit-length vectors.
///
/// Callers hand in vectors that are already normalized, so the dot product is the cosine and no
/// extra normalization pass is made. Mismatched lengths compare over the shared prefix.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scales `values` to unit length in place. Returns `false` for a zero or non-finite vector,
/// which is left untouched.
pub fn normalize(values: &mut [f32]) -> bool {
    let length = values.iter().map(|value| value * value).sum::<f32>().sqrt();
    if !length.is_finite() || length <= f32::EPSILON {
        return false;
    }

    for value in values.iter_mut() {
        *value /= length;
    }
    true
}
