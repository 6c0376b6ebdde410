use crate::domain::dispatch::expand_batches;
use crate::domain::{DispatchReport, KeyMaterial, PreparedBatch, RetryPolicy, UnsignedTransaction, WalletAddress};
use crate::foundation::util::time::throughput;
use crate::foundation::{LoadError, Result, DEFAULT_PROGRESS_EVERY, DEFAULT_SIGN_ATTEMPTS};
use crate::infrastructure::rpc::{retry, NodeApi};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    pub worker_count: usize,
    /// Budget for signing one transaction; exhausting it skips the transaction.
    pub sign_policy: RetryPolicy,
    pub fresh_worker_address: bool,
    pub progress_every: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            worker_count: 1,
            sign_policy: RetryPolicy::immediate(DEFAULT_SIGN_ATTEMPTS),
            fresh_worker_address: true,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

type WorkQueue = Arc<Mutex<mpsc::UnboundedReceiver<UnsignedTransaction>>>;

/// Spends prepared unit outputs with a bounded pool of concurrent workers.
pub struct DispatchEngine {
    node: Arc<dyn NodeApi>,
    settings: DispatchSettings,
}

impl DispatchEngine {
    pub fn new(node: Arc<dyn NodeApi>, settings: DispatchSettings) -> Self {
        Self { node, settings }
    }

    /// Sends one unit transfer per prepared unit output from `spender` to `receiver`.
    ///
    /// The full queue is built before any worker starts. A signing failure is retried within the
    /// sign policy and then skipped; a submission failure stops the worker that hit it. The
    /// shared success counter is the only state the workers have in common.
    pub async fn send_transactions(
        &self,
        batches: &[PreparedBatch],
        keys: &KeyMaterial,
        spender: &WalletAddress,
        receiver: &WalletAddress,
    ) -> Result<DispatchReport> {
        let worker_count = self.settings.worker_count;
        if worker_count == 0 {
            return Err(LoadError::ConfigError("worker_count must be > 0".to_string()));
        }

        let started = Instant::now();
        let work = expand_batches(batches, spender, receiver)?;
        let queued = work.len();
        let (tx, rx) = mpsc::unbounded_channel();
        for unsigned in work {
            tx.send(unsigned).map_err(|_| LoadError::TaskFailed("dispatch queue closed while filling".to_string()))?;
        }
        drop(tx);
        info!("dispatch queue filled spender={} queued={} workers={}", spender, queued, worker_count);

        let queue: WorkQueue = Arc::new(Mutex::new(rx));
        let succeeded = Arc::new(AtomicU64::new(0));
        let keys = Arc::new(keys.clone());
        let handles = (0..worker_count)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    node: self.node.clone(),
                    queue: queue.clone(),
                    keys: keys.clone(),
                    succeeded: succeeded.clone(),
                    settings: self.settings.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect::<Vec<_>>();

        let mut join_error = None;
        for handle in handles {
            if let Err(err) = handle.await {
                error!("dispatch worker panicked error={}", err);
                join_error.get_or_insert(err);
            }
        }
        if let Some(err) = join_error {
            return Err(err.into());
        }

        let elapsed = started.elapsed();
        let succeeded = succeeded.load(Ordering::SeqCst);
        let tps = throughput(succeeded, elapsed);
        info!(
            "dispatch done spender={} queued={} succeeded={} elapsed_ms={} tps={:.2}",
            spender,
            queued,
            succeeded,
            elapsed.as_millis(),
            tps
        );
        Ok(DispatchReport { queued, succeeded, elapsed, tps })
    }
}

struct Worker {
    id: usize,
    node: Arc<dyn NodeApi>,
    queue: WorkQueue,
    keys: Arc<KeyMaterial>,
    succeeded: Arc<AtomicU64>,
    settings: DispatchSettings,
}

impl Worker {
    async fn run(self) {
        debug!("dispatch worker started worker={}", self.id);
        if self.settings.fresh_worker_address {
            if let Err(err) = self.node.generate_new_address().await {
                warn!("dispatch worker could not obtain an address worker={} error={}", self.id, err);
                return;
            }
        }

        let (node, keys, id) = (&self.node, self.keys.as_ref(), self.id);
        let mut sent = 0u64;
        loop {
            let next = self.queue.lock().await.recv().await;
            let Some(unsigned) = next else {
                break;
            };
            let signed = retry(self.settings.sign_policy, |attempt| {
                let unsigned = &unsigned;
                async move {
                    node.sign_transaction(unsigned, keys).await.map_err(|err| {
                        debug!("dispatch sign failed worker={} attempt={} error={}", id, attempt, err);
                        err
                    })
                }
            })
            .await;
            let signed = match signed {
                Ok(signed) => signed,
                Err(err) => {
                    warn!("dispatch transaction skipped after signing failures worker={} error={}", self.id, err);
                    continue;
                }
            };
            if let Err(err) = self.node.submit_transaction(&signed).await {
                warn!("dispatch worker aborting on submit failure worker={} tx_id={} error={}", self.id, signed.id(), err);
                return;
            }
            if self.settings.progress_every > 0 && sent % self.settings.progress_every == 0 {
                info!("dispatch progress worker={} sent={} tx_id={}", self.id, sent, signed.id());
            }
            sent += 1;
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        }
        debug!("dispatch worker finished worker={} sent={}", self.id, sent);
    }
}
