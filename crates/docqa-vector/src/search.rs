/// Squared Euclidean distance.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| { let d = x - y; d * d }).sum()
}

/// Brute-force scan of a row-major block. Returns `(row, distance)` for the
/// `k` closest rows, ascending by distance; ties keep insertion order.
/// NaN distances sort after every finite one.
pub fn exact_top_k(data: &[f32], dimension: usize, query: &[f32], k: usize) -> Vec<(usize, f32)> {
    if dimension == 0 || k == 0 { return Vec::new(); }
    let mut scored: Vec<(usize, f32)> = data
        .chunks_exact(dimension)
        .enumerate()
        .map(|(row, v)| (row, l2_squared(v, query)))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}
