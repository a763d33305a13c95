//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::future::Future;
use std::time::Instant;

/// Times one repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("settings_load");
/// let result = sqlx::query_as::<_, SettingEntity>(...).fetch_all(&pool).await;
/// timer.finish(&result);
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed time, labelled with the query outcome.
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        histogram!(
            "dispatch_db_query_duration_seconds",
            "query" => self.query_name,
            "outcome" => outcome
        )
        .record(self.start.elapsed().as_secs_f64());

        if result.is_err() {
            counter!("dispatch_db_query_errors_total", "query" => self.query_name).increment(1);
        }
    }
}

/// Awaits `query` under a [`QueryTimer`].
pub async fn timed<F, T, E>(query_name: &'static str, query: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let timer = QueryTimer::new(query_name);
    let result = query.await;
    timer.finish(&result);
    result
}

/// Publishes connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("dispatch_db_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("dispatch_db_connections_idle").set(idle as f64);
}
