mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TRUE_MATCH, scenario_catalog, scenario_unknown};
use rusty_raman::config::polynomial_sweep;
use rusty_raman::{
    Catalog, CatalogRecord, MatchConfig, MatchError, MatchPipeline, RankingDriver, Spectrum,
};

fn presets() -> Vec<MatchConfig> {
    vec![
        MatchConfig::envelope(),
        MatchConfig::air_pls(),
        MatchConfig::polynomial(1),
    ]
}

#[test]
fn true_match_ranks_first_for_every_strategy() {
    let unknown = scenario_unknown();
    let catalog = scenario_catalog();
    let driver = RankingDriver::new(0);

    for config in presets() {
        let report = driver.rank(&unknown, &catalog, &config, 5).unwrap();
        let name = config.describe();
        assert!(report.failures.is_empty(), "{name}: {:?}", report.failures);
        assert_eq!(report.matches.len(), 5, "{name}");

        let best = &report.matches[0];
        assert_eq!(best.index, TRUE_MATCH, "{name}: {:?}", report.matches);
        assert_eq!(best.label, "ref_2");
        assert!(best.score > 0.8, "{name}: best score {}", best.score);
        for other in &report.matches[1..] {
            assert!(other.score < 0.3, "{name}: {} scored {}", other.label, other.score);
        }
    }
}

#[test]
fn matches_are_sorted_and_scores_bounded() {
    let report = RankingDriver::new(2)
        .rank(&scenario_unknown(), &scenario_catalog(), &MatchConfig::air_pls(), 3)
        .unwrap();
    assert_eq!(report.matches.len(), 3);
    for pair in report.matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(report.scores.as_slice().iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn worker_count_does_not_change_scores() {
    let unknown = scenario_unknown();
    let catalog = scenario_catalog();
    let config = MatchConfig::envelope();
    let serial = RankingDriver::new(1).rank(&unknown, &catalog, &config, 5).unwrap();
    let parallel = RankingDriver::new(4).rank(&unknown, &catalog, &config, 5).unwrap();
    for (a, b) in serial.scores.as_slice().iter().zip(parallel.scores.as_slice()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    assert_eq!(serial.matches, parallel.matches);
}

#[test]
fn pipeline_score_matches_ranking_table() {
    let unknown = scenario_unknown();
    let catalog = scenario_catalog();
    let pipeline = MatchPipeline::new(MatchConfig::polynomial(1)).unwrap();
    let report = RankingDriver::new(0)
        .rank(&unknown, &catalog, pipeline.config(), 5)
        .unwrap();

    let record = &catalog.fetch_all()[TRUE_MATCH];
    let pair = pipeline.process(unknown.view(), record.spectrum.view()).unwrap();
    assert_eq!(report.scores.get(TRUE_MATCH, 0), Some(pair.score));
    assert!(pair.reference.x[0] >= pair.unknown.x[0]);
    assert!(pair.reference.x.last() <= pair.unknown.x.last());
}

#[test]
fn malformed_record_fails_alone() {
    let unknown = scenario_unknown();
    let mut records = scenario_catalog().into_records();
    // descending domain
    records.push(CatalogRecord::new(
        "reversed",
        Spectrum {
            x: (0..500).map(|k| 100.0 - k as f64 * 0.1).collect(),
            y: vec![1.0; 500],
        },
    ));
    // no overlap with the unknown at all
    records.push(CatalogRecord::new(
        "far_away",
        Spectrum {
            x: (0..500).map(|k| 1000.0 + k as f64).collect(),
            y: (0..500).map(|k| (k as f64).sin()).collect(),
        },
    ));
    let catalog = Catalog::from_records(records);

    let report = RankingDriver::new(0)
        .rank(&unknown, &catalog, &MatchConfig::polynomial(1), 10)
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].index, 5);
    assert!(matches!(report.failures[0].error, MatchError::InvalidDomain(_)));
    assert_eq!(report.failures[1].label, "far_away");
    assert!(matches!(report.failures[1].error, MatchError::AlignmentInvariant(_)));
    assert_eq!(report.scores.get(5, 0), Some(f64::NEG_INFINITY));

    assert_eq!(report.matches.len(), 5);
    assert_eq!(report.matches[0].index, TRUE_MATCH);
    assert!(report.matches.iter().all(|m| m.index < 5));
}

#[test]
fn invalid_unknown_aborts_the_run() {
    let catalog = scenario_catalog();
    let unknown = Spectrum {
        x: vec![0.0, 2.0, 1.0],
        y: vec![1.0, 2.0, 3.0],
    };
    let err = RankingDriver::new(0)
        .rank(&unknown, &catalog, &MatchConfig::air_pls(), 3)
        .unwrap_err();
    assert!(matches!(err, MatchError::InvalidDomain(_)));
}

#[test]
fn invalid_filter_aborts_the_run() {
    let mut config = MatchConfig::air_pls();
    config.filter.cutoff = config.filter.sample_rate;
    let err = RankingDriver::new(0)
        .rank(&scenario_unknown(), &scenario_catalog(), &config, 3)
        .unwrap_err();
    assert!(matches!(err, MatchError::FilterDesign(_)));
}

#[test]
fn polynomial_sweep_reports_configuration() {
    let configs = polynomial_sweep(1, 3).unwrap();
    let report = RankingDriver::new(0)
        .rank_sweep(&scenario_unknown(), &scenario_catalog(), &configs, 4)
        .unwrap();

    assert_eq!(report.scores.columns(), 3);
    assert_eq!(report.scores.as_slice().len(), 15);
    // the true record dominates under every order, so it fills the top three
    for m in &report.matches[..3] {
        assert_eq!(m.index, TRUE_MATCH);
        assert!(m.config_index < 3);
        assert!(m.score > 0.8);
    }
    assert_ne!(report.matches[3].index, TRUE_MATCH);
}

#[test]
fn timed_run_returns_the_same_report() {
    let unknown = scenario_unknown();
    let catalog = scenario_catalog();
    let config = MatchConfig::polynomial(1);
    let driver = RankingDriver::new(0);

    let direct = driver.rank(&unknown, &catalog, &config, 5).unwrap();
    let timed = driver
        .rank_with_timeout(
            Arc::new(unknown),
            Arc::new(catalog),
            vec![config],
            5,
            Duration::from_secs(120),
        )
        .unwrap();
    assert_eq!(direct.matches, timed.matches);
}

#[test]
fn expired_deadline_is_a_batch_timeout() {
    let err = RankingDriver::new(1)
        .rank_with_timeout(
            Arc::new(scenario_unknown()),
            Arc::new(scenario_catalog()),
            vec![MatchConfig::envelope()],
            5,
            Duration::ZERO,
        )
        .unwrap_err();
    assert_eq!(err, MatchError::BatchTimeout(Duration::ZERO));
}
