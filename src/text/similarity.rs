use similar::TextDiff;

/// Similarity ratio in `0.0..=1.0`: twice the matched characters over the
/// combined length. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Case-insensitive similarity as a rounded percentage.
pub fn match_percentage(a: &str, b: &str) -> u32 {
    (ratio(&a.to_lowercase(), &b.to_lowercase()) * 100.0).round() as u32
}

/// Best option for `target` and its percentage. Ties keep the earliest option.
pub fn best_match<'a, S: AsRef<str>>(target: &str, options: &'a [S]) -> Option<(usize, &'a str, u32)> {
    let mut best: Option<(usize, &str, u32)> = None;
    for (i, option) in options.iter().enumerate() {
        let score = match_percentage(target, option.as_ref());
        if best.map_or(true, |(_, _, s)| score > s) {
            best = Some((i, option.as_ref(), score));
        }
    }
    best
}
