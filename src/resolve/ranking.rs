use crate::config::thresholds::Thresholds;
use crate::text::similarity::match_percentage;

/// An option index with its similarity to the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked {
    pub index: usize,
    pub score: u32,
}

/// Options by similarity to `answer`, best first. Ties keep page order.
pub fn rank<S: AsRef<str>>(options: &[S], answer: &str) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = options
        .iter()
        .enumerate()
        .map(|(index, o)| Ranked { index, score: match_percentage(o.as_ref(), answer) })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Pick options from a ranking.
///
/// Everything at or above `select_all` wins. Otherwise a result at or above
/// `select_best` wins alone, unless several clear that bar among more than
/// three options. Below that, the best option is taken when it clears the
/// floor or the field is required. An empty result means skip.
pub fn select(ranked: &[Ranked], total_options: usize, required: bool, thresholds: &Thresholds) -> Vec<usize> {
    let above = |bar: u32| ranked.iter().filter(move |r| r.score >= bar).map(|r| r.index);

    let all: Vec<usize> = above(thresholds.select_all).collect();
    if !all.is_empty() {
        return all;
    }

    let Some(best) = ranked.first() else {
        return Vec::new();
    };

    let good: Vec<usize> = above(thresholds.select_best).collect();
    if !good.is_empty() {
        if good.len() > 1 && total_options > 3 {
            return good;
        }
        return vec![best.index];
    }

    if best.score >= thresholds.select_floor || required {
        return vec![best.index];
    }
    Vec::new()
}
