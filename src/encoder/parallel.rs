//! Parallel encoding over a shared record source

use super::{EntityEncoder, Parallelism};
use crate::error::{Error, Result};
use crate::sink::BatchSink;
use crate::types::Entity;
use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::ThreadPoolBuilder;
use tracing::debug;

impl<S: BatchSink + Send> EntityEncoder<S> {
    /// Encode every record, scheduling them as `parallelism` says
    ///
    /// Workers pull records from `records` as they become free. The first
    /// error stops all workers and is returned; rows already appended stay
    /// in the sink. Does not call `finish`.
    pub fn encode_parallel<I>(&self, records: I, parallelism: Parallelism) -> Result<()>
    where
        I: Iterator<Item = Result<Entity>> + Send,
    {
        match parallelism {
            Parallelism::Sequential => self.encode_all(records),
            Parallelism::Workers(workers) => {
                if workers == 0 {
                    return Err(Error::invalid_value(
                        "parallelism.workers",
                        "must be at least 1",
                    ));
                }
                let pool = ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|index| format!("osm2parquet-encoder-{index}"))
                    .build()
                    .map_err(|e| Error::config(format!("Failed to build encoder pool: {e}")))?;
                debug!(workers, "Encoding on dedicated pool");
                pool.install(|| self.encode_bridged(records))
            }
            Parallelism::Unbounded => {
                debug!(
                    workers = rayon::current_num_threads(),
                    "Encoding on global pool"
                );
                self.encode_bridged(records)
            }
        }
    }

    fn encode_bridged<I>(&self, records: I) -> Result<()>
    where
        I: Iterator<Item = Result<Entity>> + Send,
    {
        records
            .par_bridge()
            .try_for_each(|record| self.encode(&record?))
    }
}
