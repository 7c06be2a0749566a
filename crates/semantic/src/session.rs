use once_cell::sync::OnceCell;
use onnxruntime::{environment::Environment, session::Session};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;
use tracing::debug;

use crate::onnx::embed_encoded;
use crate::tokenize::EncodedText;
use crate::SemanticError;

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

/// One forward pass from encoded text to a pooled vector.
pub(crate) trait Inference {
    fn infer(&mut self, encoded: &EncodedText) -> Result<Vec<f32>, SemanticError>;
}

pub(crate) struct OnnxInference {
    session: Session<'static>,
}

impl OnnxInference {
    pub(crate) fn open(model_path: &Path) -> Result<Self, SemanticError> {
        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_model_from_file(model_path.to_path_buf())
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        debug!(model = %model_path.display(), "onnx session created");
        Ok(Self { session })
    }
}

impl Inference for OnnxInference {
    fn infer(&mut self, encoded: &EncodedText) -> Result<Vec<f32>, SemanticError> {
        embed_encoded(&mut self.session, encoded)
    }
}

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("kb-semantic")
            .build()
            .map_err(|e| SemanticError::Inference(e.to_string()))
    })
}

type Reply = oneshot::Sender<Result<Vec<f32>, SemanticError>>;

struct Job {
    encoded: EncodedText,
    reply: Reply,
}

/// Owns the process's only inference session on a dedicated thread.
///
/// The session is opened on that thread and never leaves it; callers queue
/// encoded text and wait for the pooled vector. The thread exits once every
/// handle is dropped.
pub(crate) struct InferenceWorker {
    jobs: mpsc::Sender<Job>,
}

impl InferenceWorker {
    /// Starts the thread and waits until `open` has succeeded on it, so a
    /// broken model fails here rather than on the first query.
    pub(crate) fn spawn<F, I>(name: &str, open: F) -> Result<Self, SemanticError>
    where
        F: FnOnce() -> Result<I, SemanticError> + Send + 'static,
        I: Inference + 'static,
    {
        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), SemanticError>>(1);

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut inference = match open() {
                    Ok(inference) => {
                        let _ = ready_tx.send(Ok(()));
                        inference
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                while let Ok(job) = queue.recv() {
                    // The caller may have given up waiting; nothing to do then.
                    let _ = job.reply.send(inference.infer(&job.encoded));
                }
                debug!("inference worker stopped");
            })
            .map_err(|e| SemanticError::Inference(format!("failed to start inference thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| SemanticError::Inference("inference thread exited during startup".into()))??;
        Ok(Self { jobs })
    }

    fn submit(
        &self,
        encoded: EncodedText,
    ) -> Result<oneshot::Receiver<Result<Vec<f32>, SemanticError>>, SemanticError> {
        let (reply, receiver) = oneshot::channel();
        self.jobs
            .send(Job { encoded, reply })
            .map_err(|_| worker_stopped())?;
        Ok(receiver)
    }

    pub(crate) async fn infer(&self, encoded: EncodedText) -> Result<Vec<f32>, SemanticError> {
        self.submit(encoded)?.await.map_err(|_| worker_stopped())?
    }

    /// Must not be called from inside an async context.
    pub(crate) fn infer_blocking(&self, encoded: EncodedText) -> Result<Vec<f32>, SemanticError> {
        self.submit(encoded)?
            .blocking_recv()
            .map_err(|_| worker_stopped())?
    }
}

fn worker_stopped() -> SemanticError {
    SemanticError::Inference("inference thread is no longer running".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// `[sum of live ids, live positions]`.
    struct IdSum;

    impl Inference for IdSum {
        fn infer(&mut self, encoded: &EncodedText) -> Result<Vec<f32>, SemanticError> {
            let live: i64 = encoded
                .ids
                .iter()
                .zip(&encoded.mask)
                .map(|(id, m)| id * m)
                .sum();
            Ok(vec![live as f32, encoded.mask.iter().sum::<i64>() as f32])
        }
    }

    fn counting_worker(opens: Arc<AtomicUsize>) -> InferenceWorker {
        InferenceWorker::spawn("test-inference", move || {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok(IdSum)
        })
        .unwrap()
    }

    fn encoded(ids: Vec<i64>) -> EncodedText {
        let mask = vec![1; ids.len()];
        EncodedText { ids, mask }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn session_opens_once_for_concurrent_callers() {
        let opens = Arc::new(AtomicUsize::new(0));
        let worker = Arc::new(counting_worker(opens.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..32i64 {
            let worker = worker.clone();
            tasks.spawn(async move { (n, worker.infer(encoded(vec![101, n, 102])).await) });
        }
        while let Some(joined) = tasks.join_next().await {
            let (n, result) = joined.unwrap();
            assert_eq!(result.unwrap(), vec![(203 + n) as f32, 3.0]);
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blocking_callers_share_the_session() {
        let opens = Arc::new(AtomicUsize::new(0));
        let worker = Arc::new(counting_worker(opens.clone()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let worker = worker.clone();
                thread::spawn(move || worker.infer_blocking(encoded(vec![1, 2])).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![3.0, 2.0]);
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn open_failure_is_reported_by_spawn() {
        let result = InferenceWorker::spawn("test-inference", || -> Result<IdSum, SemanticError> {
            Err(SemanticError::Inference("bad graph".into()))
        });
        assert!(matches!(result, Err(SemanticError::Inference(ref m)) if m == "bad graph"));
    }
}
