use rand::Rng;

/// Uniform in-place shuffle (Fisher–Yates, Durstenfeld variant).
///
/// Walks `i` from the last index down to 1 and swaps element `i` with an
/// index drawn uniformly from `0..=i`, so each of the `n!` orderings is
/// equally likely given a uniform `rng`.
pub fn uniform_shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
