use crash_dedup::{
    compute_all_parts, merge_parts, DistanceMatrix, DistanceMetric, FrameToken, MatrixPartitioner,
};
use pretty_assertions::assert_eq;

const ALL_METRICS: [DistanceMetric; 4] = [
    DistanceMetric::Levenshtein,
    DistanceMetric::DamerauLevenshtein,
    DistanceMetric::JaroWinkler,
    DistanceMetric::Jaccard,
];

/// Surfaces the library's debug logging under RUST_LOG when a test fails
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn seq(names: &[&str]) -> Vec<FrameToken> {
    names.iter().map(|n| FrameToken::new(*n, None)).collect()
}

fn sequences() -> Vec<Vec<FrameToken>> {
    vec![
        seq(&["f1", "f2", "f3", "f4", "f5", "f6"]),
        seq(&["f1", "f2", "f3", "g4", "g5", "g6"]),
        seq(&["read_config", "init", "main"]),
        seq(&["f1", "f4", "f5"]),
        seq(&["loop", "loop", "loop", "main"]),
        seq(&["write_cache", "flush", "exit_handler", "main"]),
        seq(&["f1", "f2", "f3"]),
    ]
}

#[test]
fn test_identical_sequences_score_zero_under_edit_metrics() {
    let a = seq(&["f1", "f2", "f3"]);
    assert_eq!(DistanceMetric::Levenshtein.distance(&a, &a), 0.0);
    assert_eq!(DistanceMetric::DamerauLevenshtein.distance(&a, &a), 0.0);
    assert_eq!(DistanceMetric::Jaccard.distance(&a, &a), 0.0);
}

#[test]
fn test_component_aware_matching() {
    let a = vec![FrameToken::new("f1", Some("lib1"))];
    let same = vec![FrameToken::new("f1", Some("lib1"))];
    assert_eq!(DistanceMetric::Levenshtein.distance(&a, &same), 0.0);

    // component compared only when both sides know it
    let unknown_lib = vec![FrameToken::new("f1", None)];
    assert_eq!(DistanceMetric::Levenshtein.distance(&a, &unknown_lib), 0.0);

    let other_lib = vec![FrameToken::new("f1", Some("lib2"))];
    assert_eq!(DistanceMetric::Levenshtein.distance(&a, &other_lib), 1.0);
}

#[test]
fn test_partial_overlap_levenshtein() {
    let a = seq(&["f1", "f2", "f3"]);
    let b = seq(&["f1", "f4", "f5"]);
    let d = DistanceMetric::Levenshtein.distance(&a, &b);
    assert!((d - 2.0 / 3.0).abs() < 1e-6, "got {}", d);
}

#[test]
fn test_empty_sequence_rules_hold_for_every_metric() {
    let empty: Vec<FrameToken> = Vec::new();
    let nonempty = seq(&["main"]);
    for metric in ALL_METRICS {
        assert_eq!(metric.distance(&empty, &empty), 0.0, "{:?}", metric);
        assert_eq!(metric.distance(&empty, &nonempty), 1.0, "{:?}", metric);
        assert_eq!(metric.distance(&nonempty, &empty), 1.0, "{:?}", metric);
    }
}

#[test]
fn test_scores_stay_in_unit_interval() {
    let seqs = sequences();
    for metric in ALL_METRICS {
        for a in &seqs {
            for b in &seqs {
                let d = metric.distance(a, b);
                assert!((0.0..=1.0).contains(&d), "{:?}: {}", metric, d);
            }
        }
    }
}

#[test]
fn test_symmetric_metrics_are_symmetric() {
    let seqs = sequences();
    for metric in [
        DistanceMetric::Levenshtein,
        DistanceMetric::DamerauLevenshtein,
        DistanceMetric::Jaccard,
    ] {
        for a in &seqs {
            for b in &seqs {
                assert_eq!(metric.distance(a, b), metric.distance(b, a), "{:?}", metric);
            }
        }
    }
}

#[test]
fn test_jaro_winkler_self_distance_near_zero() {
    let a = seq(&["f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8"]);
    let d = DistanceMetric::JaroWinkler.distance(&a, &a);
    assert!(d < 1e-6, "got {}", d);
}

#[test]
fn test_jaro_winkler_prefix_pulls_distance_down() {
    let base = seq(&["f1", "f2", "f3", "f4", "f5", "f6"]);
    let shared_prefix = seq(&["f1", "f2", "f3", "f4", "g5", "g6"]);
    let no_prefix = seq(&["g1", "g2", "f3", "f4", "f5", "f6"]);
    let with_prefix = DistanceMetric::JaroWinkler.distance(&base, &shared_prefix);
    let without = DistanceMetric::JaroWinkler.distance(&base, &no_prefix);
    assert!(with_prefix < without);
}

#[test]
fn test_matrix_agrees_with_pairwise_metric() {
    let seqs = sequences();
    for metric in ALL_METRICS {
        let matrix = DistanceMatrix::new(&seqs, metric).unwrap();
        assert_eq!(matrix.sequence_count(), seqs.len());
        for i in 0..seqs.len() {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in i + 1..seqs.len() {
                assert_eq!(matrix.get(i, j), metric.distance(&seqs[i], &seqs[j]));
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }
}

#[test]
fn test_partitioned_computation_is_bit_identical() {
    init_logging();
    let seqs = sequences();
    let pair_count = seqs.len() * (seqs.len() - 1) / 2;

    for metric in ALL_METRICS {
        let whole = DistanceMatrix::new(&seqs, metric).unwrap();

        for parts_requested in [1, 2, 3, 5, pair_count, pair_count * 10] {
            let mut parts =
                MatrixPartitioner::create(seqs.len(), parts_requested, metric).unwrap();
            assert!(parts.len() <= pair_count);
            assert!(parts.iter().all(|p| !p.is_empty()));

            compute_all_parts(&mut parts, &seqs).unwrap();
            let merged = merge_parts(&parts).unwrap();
            assert_eq!(whole, merged, "{:?} with {} parts", metric, parts_requested);
        }
    }
}

#[test]
fn test_merge_accepts_any_part_order() {
    let seqs = sequences();
    let mut parts =
        MatrixPartitioner::create(seqs.len(), 4, DistanceMetric::Levenshtein).unwrap();
    compute_all_parts(&mut parts, &seqs).unwrap();

    let forward = merge_parts(&parts).unwrap();
    parts.rotate_left(2);
    parts.reverse();
    let shuffled = merge_parts(&parts).unwrap();
    assert_eq!(forward, shuffled);
}

#[test]
fn test_parts_are_independent_units() {
    // computing only one part never touches or requires the others
    let seqs = sequences();
    let mut parts =
        MatrixPartitioner::create(seqs.len(), 3, DistanceMetric::Jaccard).unwrap();
    parts[1].compute(&seqs).unwrap();
    assert!(parts[1].is_computed());
    assert!(!parts[0].is_computed());
    assert!(!parts[2].is_computed());
}
