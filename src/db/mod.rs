use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod migrations;
mod repositories;
mod store;

use migrations::run_migrations;

pub use store::{KeyValueStore, MemoryStore, SqliteStore};

/// Identifier of the local store; also the SQLite file stem.
pub const STORE_NAME: &str = "timo-client";

pub const TIMERS_KEY: &str = "timers";
pub const CATEGORIES_KEY: &str = "categories";

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(Job),
    Stop,
}

struct Worker {
    jobs: mpsc::Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.jobs.send(WorkerMessage::Stop).is_err() {
            error!("store worker already gone at shutdown");
        }
        if let Err(err) = handle.join() {
            error!("store worker panicked: {err:?}");
        }
    }
}

/// Open `path`, switch to WAL and bring the schema up to date.
fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite store at {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal unavailable for {}: {err}", path.display());
    }

    run_migrations(&mut conn).context("failed to migrate store schema")?;
    Ok(conn)
}

fn run_worker(mut conn: Connection, jobs: mpsc::Receiver<WorkerMessage>) {
    for message in jobs {
        match message {
            WorkerMessage::Run(job) => job(&mut conn),
            WorkerMessage::Stop => break,
        }
    }
    debug!("store worker stopped");
}

/// Handle to the SQLite worker thread. Each `execute` call runs as one job
/// on that thread, so a single statement is its own atomic unit.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Blocks until the file is open and migrated.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<WorkerMessage>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let worker_path = path.clone();

        let thread = thread::Builder::new()
            .name("timo-db".into())
            .spawn(move || match open_connection(&worker_path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        run_worker(conn, jobs_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited during startup")??;
        info!("Store opened at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                thread: Mutex::new(Some(thread)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `task` on the worker thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                debug!("store caller went away before its result arrived");
            }
        });

        self.worker
            .jobs
            .send(WorkerMessage::Run(job))
            .map_err(|_| anyhow!("store worker is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store worker dropped the job"))?
    }
}

/// Default location of the store inside `data_dir`.
pub fn default_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(format!("{STORE_NAME}.sqlite3"))
}
