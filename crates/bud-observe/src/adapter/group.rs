use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Barrier;

/// Read-only view of the multi-process coordination state.
///
/// The state itself (ranks, the barrier, which process is main) is owned by whatever launched
/// the processes; the logging adapter only reads it.
#[async_trait]
pub trait ProcessGroup: Send + Sync {
    /// Whether the coordination state has been set up.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Rank of the current process, in `0..num_processes()`.
    fn process_index(&self) -> usize;

    fn num_processes(&self) -> usize;

    fn is_main_process(&self) -> bool {
        self.process_index() == 0
    }

    /// Block until every process of the group reaches this point.
    async fn wait_for_everyone(&self);
}

/// Group whose members are tasks of the current process.
#[derive(Debug, Clone)]
pub struct LocalGroup {
    index: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl LocalGroup {
    /// One handle per rank, all sharing a barrier of `size` participants.
    pub fn ranks(size: usize) -> Vec<LocalGroup> {
        let size = size.max(1);
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|index| LocalGroup {
                index,
                size,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    /// A group with a single, main process.
    pub fn single() -> LocalGroup {
        LocalGroup {
            index: 0,
            size: 1,
            barrier: Arc::new(Barrier::new(1)),
        }
    }
}

#[async_trait]
impl ProcessGroup for LocalGroup {
    fn process_index(&self) -> usize {
        self.index
    }

    fn num_processes(&self) -> usize {
        self.size
    }

    async fn wait_for_everyone(&self) {
        self.barrier.wait().await;
    }
}
