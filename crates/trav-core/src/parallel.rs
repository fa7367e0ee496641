//! Clone-per-partition execution
//!
//! A traversal is single-threaded. To spread work over threads the locked
//! template is cloned once per partition of the start values and every clone
//! runs on its own rayon worker. Results come back in partition order.
//!
//! Reducing steps such as counts reduce per partition, and every clone has
//! its own side-effect store.

use crate::error::{EngineError, Result};
use rayon::prelude::*;
use tracing::debug;
use trav_process::step::InjectStep;
use trav_process::{Coefficient, Payload, Traversal};

/// Run `template` over `starts` split into at most `partitions` chunks
///
/// An unlocked template is locked on a copy first, so strategies run once
/// and every worker receives an already rewritten pipeline. A template that
/// begins with a source step runs as a single copy holding every start, so
/// its source values are emitted once, exactly as in sequential iteration.
/// With no starts a single copy runs as well.
///
/// `parallelism` bounds the worker count with a dedicated pool; `None` uses
/// the global rayon pool.
///
/// # Errors
///
/// Returns a traversal error when locking, cloning or iterating fails, and
/// [`EngineError::ThreadPool`] when the dedicated pool cannot be built.
pub fn execute_partitioned<T, C>(
    template: &Traversal<T, C>,
    starts: Vec<T>,
    partitions: usize,
    parallelism: Option<usize>,
) -> Result<Vec<T>>
where
    T: Payload,
    C: Coefficient,
{
    let mut locked = template.try_clone()?;
    if !locked.is_locked() {
        locked.apply_strategies()?;
    }

    // a source step would re-emit its values in every partition
    let partitions = if locked.start_step().is::<InjectStep<T>>() {
        1
    } else {
        partitions.max(1)
    };
    let chunk_size = starts.len().div_ceil(partitions).max(1);
    let count = starts.len().div_ceil(chunk_size).max(1);
    let mut remaining = starts.into_iter();
    let units = (0..count)
        .map(|_| -> Result<(Traversal<T, C>, Vec<T>)> {
            let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
            Ok((locked.try_clone()?, chunk))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(traversal = %template.id(), partitions = units.len(), "partitioned execution");

    let run = move || {
        units
            .into_par_iter()
            .map(|(mut traversal, chunk)| -> Result<Vec<T>> {
                traversal.add_start_values(chunk)?;
                let values = traversal.to_list()?;
                traversal.close();
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()
    };

    let outputs = match parallelism {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("trav-worker-{i}"))
                .build()
                .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
            pool.install(run)?
        }
        None => run()?,
    };
    Ok(outputs.into_iter().flatten().collect())
}
