//! Parallel scoring of one unknown spectrum against a whole catalog.
//!
//! The unit of work is one (record, configuration) cell. Cells share only
//! read-only inputs: the unknown, the catalog and the pipelines. A failing
//! cell is logged, scored `-inf` and reported; it never aborts its siblings.
//! Problems with the unknown itself or with a configuration are detected
//! before fan-out and fail the whole run.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;

use crate::config::MatchConfig;
use crate::data::model::{Catalog, Spectrum};
use crate::error::{MatchError, Result};
use crate::processing::pipeline::MatchPipeline;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    /// Position of the record in the catalog.
    pub index: usize,
    pub label: String,
    pub score: f64,
    /// Which configuration of the run produced the score (0 for single-config runs).
    pub config_index: usize,
}

/// A cell that could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    pub label: String,
    pub config_index: usize,
    pub reason: String,
    #[serde(skip)]
    pub error: MatchError,
}

/// Score of every (record, configuration) cell, record-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    columns: usize,
    scores: Vec<f64>,
}

impl ScoreTable {
    pub fn new(columns: usize, scores: Vec<f64>) -> Self {
        Self { columns, scores }
    }

    pub fn get(&self, index: usize, config_index: usize) -> Option<f64> {
        if config_index >= self.columns {
            return None;
        }
        self.scores.get(index * self.columns + config_index).copied()
    }

    /// Number of configurations per record.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    fn cell(&self, flat: usize) -> (usize, usize) {
        (flat / self.columns, flat % self.columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    /// Best matches, highest score first.
    pub matches: Vec<RankedMatch>,
    pub failures: Vec<RecordFailure>,
    #[serde(skip)]
    pub scores: ScoreTable,
}

// ---------------------------------------------------------------------------
// Top-K selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    cell: usize,
}

// Higher score wins; on equal scores the lower cell index wins.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Flat indices of the `k` best finite scores, best first.
///
/// Runs in `O(n log k)` with a bounded min-heap. Non-finite scores (failed
/// cells) are never selected, so fewer than `k` indices may come back.
pub fn select_top_k(scores: &[f64], k: usize) -> Vec<(usize, f64)> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);
    for (cell, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        let candidate = Candidate { score, cell };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if heap.peek().is_some_and(|Reverse(worst)| candidate > *worst) {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }
    // ascending order of Reverse<_> is descending order of candidates
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(c)| (c.cell, c.score))
        .collect()
}

// ---------------------------------------------------------------------------
// RankingDriver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingDriver {
    /// Worker threads; 0 uses one per available core.
    pub workers: usize,
}

impl RankingDriver {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Rank the catalog against `unknown` with a single configuration.
    pub fn rank(
        &self,
        unknown: &Spectrum,
        catalog: &Catalog,
        config: &MatchConfig,
        k: usize,
    ) -> Result<RankingReport> {
        self.rank_sweep(unknown, catalog, std::slice::from_ref(config), k)
    }

    /// Rank over every (record, configuration) pair. Each match carries the
    /// index of the configuration that produced it.
    pub fn rank_sweep(
        &self,
        unknown: &Spectrum,
        catalog: &Catalog,
        configs: &[MatchConfig],
        k: usize,
    ) -> Result<RankingReport> {
        if configs.is_empty() {
            return Err(MatchError::InvalidConfig("no match configuration given".into()));
        }
        unknown.validate()?;
        let pipelines = configs
            .iter()
            .cloned()
            .map(MatchPipeline::new)
            .collect::<Result<Vec<_>>>()?;
        for pipeline in &pipelines {
            if unknown.len() < pipeline.min_samples() {
                return Err(MatchError::FilterDesign(format!(
                    "unknown spectrum has {} samples, {} needs at least {}",
                    unknown.len(),
                    pipeline.config().describe(),
                    pipeline.min_samples()
                )));
            }
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| MatchError::InvalidConfig(format!("cannot start worker pool: {e}")))?;

        let records = catalog.fetch_all();
        let columns = pipelines.len();
        info!(
            "ranking {} record(s) x {} configuration(s) on {} worker(s)",
            records.len(),
            columns,
            pool.current_num_threads()
        );
        let started = Instant::now();

        let outcomes: Vec<Result<f64>> = pool.install(|| {
            (0..records.len() * columns)
                .into_par_iter()
                .map(|flat| {
                    let (index, config_index) = (flat / columns, flat % columns);
                    pipelines[config_index].score(unknown.view(), records[index].spectrum.view())
                })
                .collect()
        });

        let mut scores = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (flat, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(score) => scores.push(score),
                Err(error) => {
                    let (index, config_index) = (flat / columns, flat % columns);
                    let label = records[index].label.clone();
                    warn!("record {index} ({label}) failed under configuration {config_index}: {error}");
                    failures.push(RecordFailure {
                        index,
                        label,
                        config_index,
                        reason: error.to_string(),
                        error,
                    });
                    scores.push(f64::NEG_INFINITY);
                }
            }
        }
        let table = ScoreTable::new(columns, scores);

        let matches: Vec<RankedMatch> = select_top_k(table.as_slice(), k)
            .into_iter()
            .map(|(flat, score)| {
                let (index, config_index) = table.cell(flat);
                RankedMatch {
                    index,
                    label: records[index].label.clone(),
                    score,
                    config_index,
                }
            })
            .collect();

        match matches.first() {
            Some(best) => info!(
                "ranked in {:.2?}: best {} ({:.4}), {} failure(s)",
                started.elapsed(),
                best.label,
                best.score,
                failures.len()
            ),
            None => info!(
                "ranked in {:.2?}: no scorable record, {} failure(s)",
                started.elapsed(),
                failures.len()
            ),
        }

        Ok(RankingReport {
            matches,
            failures,
            scores: table,
        })
    }

    /// Run [`RankingDriver::rank_sweep`] on a background thread and give up
    /// after `timeout`. The abandoned batch keeps running until it finishes,
    /// but its report is discarded.
    pub fn rank_with_timeout(
        &self,
        unknown: Arc<Spectrum>,
        catalog: Arc<Catalog>,
        configs: Vec<MatchConfig>,
        k: usize,
        timeout: Duration,
    ) -> Result<RankingReport> {
        let (tx, rx) = mpsc::channel();
        let driver = *self;
        thread::spawn(move || {
            let report = driver.rank_sweep(&unknown, &catalog, &configs, k);
            if tx.send(report).is_err() {
                debug!("batch finished after its deadline; report dropped");
            }
        });

        match rx.recv_timeout(timeout) {
            Ok(report) => report,
            Err(RecvTimeoutError::Timeout) => Err(MatchError::BatchTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(MatchError::BatchAborted(
                "worker thread exited without a report".into(),
            )),
        }
    }
}
