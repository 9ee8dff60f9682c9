use prometheus::{Counter, Histogram};

use crate::metrics::handler::{counter, histogram_fast_ops, histogram_slow_ops};
pub mod handler;
lazy_static::lazy_static!(
    pub static ref TRANSFERS_STAGED_TOTAL: Counter =
        counter("transfers_staged_total", "Total number of transfers staged inside a transaction");

    pub static ref TRANSFERS_COMMITTED_TOTAL: Counter =
        counter("transfers_committed_total", "Total number of transfers whose transaction committed");

    pub static ref WRITE_CONFLICTS_TOTAL: Counter =
        counter("write_conflicts_total", "Total number of commits rejected with a write conflict");

    pub static ref INSUFFICIENT_FUNDS_TOTAL: Counter =
        counter("insufficient_funds_total", "Total number of transfers rejected for insufficient funds");


    pub static ref TRANSFER_TIME_SECONDS: Histogram =
        histogram_slow_ops("transfer_time_seconds", "Total time spent running a transfer transaction in seconds");

    pub static ref FIXTURE_SEED_TIME_SECONDS: Histogram =
        histogram_fast_ops("fixture_seed_time_seconds", "Total time spent seeding account fixtures in seconds");
);
