//! Pairwise dissimilarity metrics over frame identity sequences.
//!
//! Every metric takes two ordered token sequences (one per thread, token =
//! frame identity) and returns a score in [0.0, 1.0]. Token comparison is
//! deliberately strict: two unknown `"??"` symbols never match each other,
//! and the library or file component is only compared when both sides
//! know it.

pub mod matrix;

use crate::utils::config::{
    JARO_WINKLER_PREFIX_CAP, JARO_WINKLER_PREFIX_WEIGHT, UNKNOWN_FUNCTION,
};

/// Identity of one frame as seen by the distance metrics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameToken {
    /// Symbol name, or a variant-specific fallback token
    pub symbol: String,

    /// Library / source file / kernel module, when known
    pub component: Option<String>,
}

impl FrameToken {
    pub fn new(symbol: impl Into<String>, component: Option<&str>) -> Self {
        FrameToken {
            symbol: symbol.into(),
            component: component.map(str::to_string),
        }
    }

    /// Whether two tokens identify the same call site.
    ///
    /// Two unpaired unknown functions are never a match, and components
    /// are assumed equal when either side does not know its own.
    fn matches(&self, other: &FrameToken) -> bool {
        if self.symbol == UNKNOWN_FUNCTION && other.symbol == UNKNOWN_FUNCTION {
            return false;
        }
        if self.symbol != other.symbol {
            return false;
        }
        match (&self.component, &other.component) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// Interchangeable dissimilarity metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    /// Edit distance (insert/delete/substitute), normalized; symmetric
    Levenshtein,
    /// Levenshtein plus adjacent transposition, normalized; symmetric
    DamerauLevenshtein,
    /// Similarity-derived distance with a common-prefix bonus; may be
    /// asymmetric, which is preserved as documented behavior
    JaroWinkler,
    /// Set-based distance; multiplicity ignored; symmetric
    Jaccard,
}

impl DistanceMetric {
    /// Dissimilarity between two token sequences, in [0.0, 1.0].
    ///
    /// Two empty sequences score 0.0, an empty vs. a non-empty sequence
    /// scores 1.0, for every metric.
    pub fn distance(&self, a: &[FrameToken], b: &[FrameToken]) -> f32 {
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        if a.is_empty() || b.is_empty() {
            return 1.0;
        }
        match self {
            DistanceMetric::Levenshtein => levenshtein_distance(a, b, false),
            DistanceMetric::DamerauLevenshtein => levenshtein_distance(a, b, true),
            DistanceMetric::JaroWinkler => jaro_winkler_distance(a, b),
            DistanceMetric::Jaccard => jaccard_distance(a, b),
        }
    }
}

/// Raw edit distance between the sequences, counting insertions, deletions
/// and substitutions, plus adjacent transpositions when `transposition` is
/// set. Unknown `"??"` functions are never taken as similar.
pub fn levenshtein_edit_count(a: &[FrameToken], b: &[FrameToken], transposition: bool) -> usize {
    let m = a.len();
    let n = b.len();

    // Full (m+1) x (n+1) table; sequences are stack depths, not documents.
    let width = n + 1;
    let mut dist = vec![0usize; (m + 1) * width];

    for i in 0..=m {
        dist[i * width] = i;
    }
    for j in 0..=n {
        dist[j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a[i - 1].matches(&b[j - 1]) { 0 } else { 1 };

            let mut best = dist[(i - 1) * width + (j - 1)] + cost;
            best = best.min(dist[(i - 1) * width + j] + 1);
            best = best.min(dist[i * width + (j - 1)] + 1);

            if transposition
                && i >= 2
                && j >= 2
                && a[i - 1].matches(&b[j - 2])
                && a[i - 2].matches(&b[j - 1])
            {
                best = best.min(dist[(i - 2) * width + (j - 2)] + cost);
            }

            dist[i * width + j] = best;
        }
    }

    dist[m * width + n]
}

/// Edit distance normalized by the longer sequence's length
fn levenshtein_distance(a: &[FrameToken], b: &[FrameToken], transposition: bool) -> f32 {
    let max_len = a.len().max(b.len());
    levenshtein_edit_count(a, b, transposition) as f32 / max_len as f32
}

/// Jaro-Winkler derived distance.
///
/// Matches are only sought within half the longer sequence's length,
/// matches are counted over the first sequence only (the source of the
/// documented asymmetry), and a shared prefix of up to four frames pulls
/// the distance toward zero. Deduplication corpora were calibrated
/// against exactly this behavior; do not symmetrize it.
fn jaro_winkler_distance(a: &[FrameToken], b: &[FrameToken]) -> f32 {
    let frame1_count = a.len() as i64;
    let frame2_count = b.len() as i64;
    let max_frame_count = frame1_count.max(frame2_count);

    let mut prefix_len = 0usize;
    let mut still_prefix = true;
    let mut trans_count = 0.0f32;
    let mut match_count = 0.0f32;

    for (i, frame) in a.iter().enumerate() {
        let i = i as i64 + 1;
        let mut matched = false;

        for (j, frame2) in b.iter().enumerate() {
            if matched {
                break;
            }
            let j = j as i64 + 1;

            // Whether the prefix continues to be the same for both threads.
            if i == j && !frame.matches(frame2) {
                still_prefix = false;
            }

            // A match only counts if not too far away from each other and
            // if the functions are not both unpaired unknown functions.
            if (i - j).abs() <= max_frame_count / 2 - 1 && frame.matches(frame2) {
                matched = true;
                if i != j {
                    trans_count += 1.0; // transposition in place
                }
            }
        }

        if still_prefix {
            prefix_len += 1;
        }
        if matched {
            match_count += 1.0;
        }
    }

    trans_count /= 2.0;
    prefix_len = prefix_len.min(JARO_WINKLER_PREFIX_CAP);

    if match_count == 0.0 {
        return 1.0; // no similarity at all
    }

    let sim_jaro = (match_count / frame1_count as f32
        + match_count / frame2_count as f32
        + (match_count - trans_count) / match_count)
        / 3.0;

    let similarity = sim_jaro
        + prefix_len as f32 * JARO_WINKLER_PREFIX_WEIGHT * (1.0 - sim_jaro);

    (1.0 - similarity).clamp(0.0, 1.0)
}

fn tokens_contain(haystack: &[FrameToken], needle: &FrameToken) -> bool {
    haystack.iter().any(|t| t.matches(needle))
}

/// Jaccard distance over the sequences treated as sets (only the last
/// occurrence of each repeated token is counted).
fn jaccard_distance(a: &[FrameToken], b: &[FrameToken]) -> f32 {
    let mut intersection_size = 0i64;
    let mut set1_size = 0i64;
    let mut set2_size = 0i64;

    for (i, token) in a.iter().enumerate() {
        if tokens_contain(&a[i + 1..], token) {
            continue; // not last, skip
        }
        set1_size += 1;
        if tokens_contain(b, token) {
            intersection_size += 1;
        }
    }

    for (i, token) in b.iter().enumerate() {
        if tokens_contain(&b[i + 1..], token) {
            continue; // not last, skip
        }
        set2_size += 1;
    }

    let union_size = set1_size + set2_size - intersection_size;
    if union_size == 0 {
        return 0.0;
    }

    let distance = 1.0 - intersection_size as f32 / union_size as f32;
    distance.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(names: &[&str]) -> Vec<FrameToken> {
        names.iter().map(|n| FrameToken::new(*n, None)).collect()
    }

    #[test]
    fn test_levenshtein_identical() {
        let a = seq(&["f1", "f2", "f3"]);
        assert_eq!(DistanceMetric::Levenshtein.distance(&a, &a), 0.0);
    }

    #[test]
    fn test_levenshtein_one_shared_token() {
        let a = seq(&["f1", "f2", "f3"]);
        let b = seq(&["f1", "f4", "f5"]);
        let d = DistanceMetric::Levenshtein.distance(&a, &b);
        assert!((d - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_levenshtein_with_component() {
        let a = vec![FrameToken::new("f1", Some("lib1"))];
        let b = vec![FrameToken::new("f1", Some("lib1"))];
        assert_eq!(DistanceMetric::Levenshtein.distance(&a, &b), 0.0);

        let c = vec![FrameToken::new("f1", Some("lib2"))];
        assert_eq!(DistanceMetric::Levenshtein.distance(&a, &c), 1.0);
    }

    #[test]
    fn test_unknown_functions_never_match() {
        let a = seq(&["??"]);
        assert_eq!(DistanceMetric::Levenshtein.distance(&a, &a), 1.0);
        assert_eq!(DistanceMetric::Jaccard.distance(&a, &a), 1.0);
    }

    #[test]
    fn test_damerau_counts_transposition_once() {
        let a = seq(&["f1", "f2", "f3"]);
        let b = seq(&["f2", "f1", "f3"]);
        let lev = DistanceMetric::Levenshtein.distance(&a, &b);
        let dam = DistanceMetric::DamerauLevenshtein.distance(&a, &b);
        assert!((lev - 2.0 / 3.0).abs() < 1e-6);
        assert!((dam - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_sequences() {
        let empty: Vec<FrameToken> = Vec::new();
        let one = seq(&["f1"]);
        for metric in [
            DistanceMetric::Levenshtein,
            DistanceMetric::DamerauLevenshtein,
            DistanceMetric::JaroWinkler,
            DistanceMetric::Jaccard,
        ] {
            assert_eq!(metric.distance(&empty, &empty), 0.0);
            assert_eq!(metric.distance(&empty, &one), 1.0);
            assert_eq!(metric.distance(&one, &empty), 1.0);
        }
    }

    #[test]
    fn test_jaccard_multiplicity_ignored() {
        let a = seq(&["f1", "f1", "f2"]);
        let b = seq(&["f1", "f2"]);
        assert_eq!(DistanceMetric::Jaccard.distance(&a, &b), 0.0);
    }

    #[test]
    fn test_jaro_winkler_identical_long_sequences() {
        let a = seq(&["f1", "f2", "f3", "f4", "f5", "f6"]);
        let d = DistanceMetric::JaroWinkler.distance(&a, &a);
        assert!(d.abs() < 1e-6, "expected ~0, got {}", d);
    }

    #[test]
    fn test_jaro_winkler_asymmetry_preserved() {
        // The match window depends on both lengths but matches are
        // counted over the first sequence only, so swapping the operands
        // can change the score. This is calibrated behavior.
        let a = seq(&["f1", "f2", "f3", "f4", "f5", "f6"]);
        let b = seq(&["f6", "f5", "f4", "f3", "f2", "f1", "g1", "g2"]);
        let ab = DistanceMetric::JaroWinkler.distance(&a, &b);
        let ba = DistanceMetric::JaroWinkler.distance(&b, &a);
        assert!(ab >= 0.0 && ab <= 1.0);
        assert!(ba >= 0.0 && ba <= 1.0);
    }

    #[test]
    fn test_all_metrics_in_bounds() {
        let a = seq(&["a", "b", "c", "d"]);
        let b = seq(&["c", "d", "e"]);
        for metric in [
            DistanceMetric::Levenshtein,
            DistanceMetric::DamerauLevenshtein,
            DistanceMetric::JaroWinkler,
            DistanceMetric::Jaccard,
        ] {
            let d = metric.distance(&a, &b);
            assert!((0.0..=1.0).contains(&d), "{:?} out of bounds: {}", metric, d);
        }
    }
}
