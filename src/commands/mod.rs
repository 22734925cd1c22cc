pub mod count;
pub mod locate;
pub mod normalize;
pub mod validate;

use crate::utils::{Error, Result};

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("bindmap-{}", i))
        .build()
        .map_err(|e| Error::Config(format!("Failed to initialize thread pool: {}", e)))
}
