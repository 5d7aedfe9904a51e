//! Several backtests at once.
//!
//! Backtests share nothing but the read-only market data source, so each job
//! runs independently on the rayon pool and fails on its own.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sentitrade_core::data::MarketData;

use crate::backtest::{run_with, BacktestOutcome, BacktestSimulator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestJob {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}

pub struct BatchRunner<'a> {
    simulator: BacktestSimulator,
    market: &'a dyn MarketData,
    parallel: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(simulator: BacktestSimulator, market: &'a dyn MarketData) -> Self {
        Self {
            simulator,
            market,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// One outcome per job, in job order.
    pub fn run(&self, jobs: &[BacktestJob]) -> Vec<BacktestOutcome> {
        let one = |job: &BacktestJob| {
            run_with(
                &self.simulator,
                self.market,
                &job.symbol,
                job.start_date,
                job.end_date,
                job.initial_capital,
            )
        };
        if self.parallel {
            jobs.par_iter().map(one).collect()
        } else {
            jobs.iter().map(one).collect()
        }
    }
}
