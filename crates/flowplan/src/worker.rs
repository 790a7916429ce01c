//! Background worker that runs the genetic optimizer on its own thread.
//!
//! Only serialized snapshots cross into the worker and only
//! `OptimizerMessage`s come back, so no live account or bound transfer
//! reference is ever shared with the caller.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flowplan_core::optimization::{GeneticConfig, OptimizationResult, OptimizerMessage, optimize};
use flowplan_core::{AccountSnapshot, SimulationSettings};

/// Request sent to the worker thread
#[derive(Debug)]
pub enum OptimizeRequest {
    Start {
        /// JSON array of account snapshots
        snapshots: String,
        settings: SimulationSettings,
        config: GeneticConfig,
    },
    Shutdown,
}

/// Response from the worker thread
#[derive(Debug)]
pub enum WorkerResponse {
    Progress(OptimizerMessage),
    /// The search ran to its generation budget
    Finished(Box<OptimizationResult>),
    Cancelled,
    Error(String),
}

/// Handle to the optimizer thread.
pub struct OptimizerWorker {
    request_tx: Sender<OptimizeRequest>,
    response_rx: Receiver<WorkerResponse>,
    cancel_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OptimizerWorker {
    pub fn new() -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));

        let ctx = WorkerContext {
            response_tx,
            cancel_flag: Arc::clone(&cancel_flag),
        };
        let thread = thread::spawn(move || ctx.run(request_rx));

        Self {
            request_tx,
            response_rx,
            cancel_flag,
            thread: Some(thread),
        }
    }

    /// Serialize the snapshots and hand them to the worker.
    pub fn start(
        &self,
        snapshots: &[AccountSnapshot],
        settings: SimulationSettings,
        config: GeneticConfig,
    ) -> Result<(), String> {
        let snapshots = serde_json::to_string(snapshots).map_err(|e| e.to_string())?;
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.request_tx
            .send(OptimizeRequest::Start {
                snapshots,
                settings,
                config,
            })
            .map_err(|_| "optimizer worker is not running".to_string())
    }

    /// Try to receive a response (non-blocking)
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next response. `Err` means the worker
    /// thread is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerResponse>, String> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err("optimizer worker stopped".to_string()),
        }
    }

    /// Stop the current search at its next progress message; the worker
    /// answers with `Cancelled` and stays available.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Hard stop: drop both channel ends and detach the thread. In-flight
    /// work is discarded; the thread exits at its next send.
    pub fn terminate(mut self) {
        self.cancel();
        if self.thread.take().is_some() {
            tracing::info!("optimizer worker terminated");
        }
    }
}

impl Default for OptimizerWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OptimizerWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(OptimizeRequest::Shutdown);
        if let Some(thread) = self.thread.take() {
            self.cancel_flag.store(true, Ordering::SeqCst);
            let _ = thread.join();
        }
    }
}

struct WorkerContext {
    response_tx: Sender<WorkerResponse>,
    cancel_flag: Arc<AtomicBool>,
}

impl WorkerContext {
    fn run(&self, request_rx: Receiver<OptimizeRequest>) {
        while let Ok(request) = request_rx.recv() {
            match request {
                OptimizeRequest::Shutdown => break,
                OptimizeRequest::Start {
                    snapshots,
                    settings,
                    config,
                } => {
                    let response = self.run_optimizer(&snapshots, settings, &config);
                    if self.response_tx.send(response).is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("optimizer worker exiting");
    }

    fn run_optimizer(
        &self,
        snapshots: &str,
        settings: SimulationSettings,
        config: &GeneticConfig,
    ) -> WorkerResponse {
        let snapshots: Vec<AccountSnapshot> = match serde_json::from_str(snapshots) {
            Ok(snapshots) => snapshots,
            Err(e) => return WorkerResponse::Error(format!("invalid snapshots: {e}")),
        };
        tracing::info!(accounts = snapshots.len(), generations = config.generations, "starting optimizer");

        let result = optimize(&snapshots, settings, config, |message| {
            if self.cancel_flag.load(Ordering::SeqCst) {
                return ControlFlow::Break(());
            }
            // a closed channel means the caller terminated us
            match self.response_tx.send(WorkerResponse::Progress(message)) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        });

        match result {
            Ok(result) if result.completed => WorkerResponse::Finished(Box::new(result)),
            Ok(_) => WorkerResponse::Cancelled,
            Err(e) => WorkerResponse::Error(e.to_string()),
        }
    }
}
