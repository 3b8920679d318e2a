//! Dispatch → queue → worker → callback, over the in-memory broker.

use async_trait::async_trait;
use domain_recommendations::{
    CatalogSnapshot, InMemoryCatalog, InMemoryTaskStore, RecommendationError,
    RecommendationProcessor, RecommendationResult, ResultCallback, ScoringEngine, TaskDescriptor,
    TaskDispatcher, TaskId, TaskQueueConsumer, TaskStatus, TaskStore, TaskSubmitter,
    task_queue_consumer,
};
use messaging::{Broker, Connector, InMemoryBroker, Message, WorkerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const QUEUE: &str = "ml_task_queue";

const CATALOG: &str = r#"{
    "users": [{"id": 7, "name": "no likes yet"}],
    "items": [
        {"id": 10, "title": "ten", "popularity": 9, "embedding": [1.0, 0.0]},
        {"id": 11, "title": "eleven", "popularity": 20, "embedding": [0.0, 1.0]},
        {"id": 12, "title": "twelve", "popularity": 5, "embedding": [0.5, 0.5]}
    ]
}"#;

/// Stands in for the external task store's result endpoint.
struct StoreCallback {
    store: Arc<InMemoryTaskStore>,
    delivered: Mutex<Vec<(TaskId, String)>>,
    failing: AtomicBool,
}

impl StoreCallback {
    fn new(store: Arc<InMemoryTaskStore>) -> Self {
        Self {
            store,
            delivered: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ResultCallback for StoreCallback {
    async fn deliver(&self, task_id: TaskId, result: &str) -> RecommendationResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecommendationError::Callback("endpoint unavailable".into()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((task_id, result.to_string()));
        self.store.set_result(task_id, result.to_string()).await?;
        Ok(())
    }
}

struct Pipeline {
    broker: InMemoryBroker,
    store: Arc<InMemoryTaskStore>,
    callback: Arc<StoreCallback>,
    consumer: Arc<TaskQueueConsumer>,
}

impl Pipeline {
    fn new() -> Self {
        let broker = InMemoryBroker::new();
        let store = Arc::new(InMemoryTaskStore::new());
        let callback = Arc::new(StoreCallback::new(store.clone()));
        let catalog = Arc::new(InMemoryCatalog::from_snapshot(
            CatalogSnapshot::from_json(CATALOG).unwrap(),
        ));

        let processor = RecommendationProcessor::new(
            catalog.clone(),
            catalog,
            Arc::new(ScoringEngine::default()),
            callback.clone(),
        );
        let consumer = Arc::new(task_queue_consumer(
            Arc::new(broker.clone()),
            processor,
            WorkerConfig::new(QUEUE).with_reconnect_delay(Duration::from_millis(20)),
        ));

        Self {
            broker,
            store,
            callback,
            consumer,
        }
    }

    async fn submitter(&self) -> TaskSubmitter<InMemoryTaskStore> {
        let connection = self.broker.connect().await.unwrap();
        TaskSubmitter::new(self.store.clone(), TaskDispatcher::new(connection, QUEUE))
    }

    fn start(&self) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let consumer = self.consumer.clone();
        let handle = tokio::spawn(async move { consumer.run(rx).await });
        (tx, handle)
    }

    async fn settled(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.broker.acked_count(QUEUE) + self.broker.rejected_count(QUEUE) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages not settled in time");
    }
}

#[tokio::test]
async fn test_user_without_vector_gets_popularity_ranking() {
    let pipeline = Pipeline::new();
    let connection = pipeline.broker.connect().await.unwrap();
    let dispatcher = TaskDispatcher::new(connection, QUEUE);
    let (shutdown, handle) = pipeline.start();

    let task = pipeline.store.create(7, 5, None).await.unwrap();
    assert!(dispatcher.submit(&task.descriptor()).await);
    pipeline.settled(1).await;

    assert_eq!(pipeline.broker.acked_count(QUEUE), 1);
    assert_eq!(
        *pipeline.callback.delivered.lock().unwrap(),
        vec![(task.id, "[11,10,12]".to_string())]
    );
    let task = pipeline.store.get(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_submitted_task_completes() {
    let pipeline = Pipeline::new();
    let submitter = pipeline.submitter().await;
    let (shutdown, handle) = pipeline.start();

    let record = submitter
        .submit(7, Some(100), Some("e".into()))
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Queued);
    pipeline.settled(1).await;

    let record = pipeline.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.result.as_deref(), Some("[11,10,12]"));

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_failed_callback_leaves_task_queued() {
    let pipeline = Pipeline::new();
    pipeline.callback.failing.store(true, Ordering::SeqCst);
    let submitter = pipeline.submitter().await;
    let (shutdown, handle) = pipeline.start();

    let record = submitter.submit(7, None, None).await.unwrap();
    pipeline.settled(1).await;

    assert_eq!(pipeline.broker.acked_count(QUEUE), 0);
    assert_eq!(pipeline.broker.rejected_count(QUEUE), 1);
    assert_eq!(pipeline.broker.ready_count(QUEUE), 0);
    let record = pipeline.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Queued);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_incomplete_descriptors_are_dropped() {
    let pipeline = Pipeline::new();
    let connection = pipeline.broker.connect().await.unwrap();
    connection.declare_queue(QUEUE).await.unwrap();
    for body in [r#"{"user_id": 7, "top_n": 5}"#, r#"{"task_id": 2}"#, "garbage"] {
        connection.publish(QUEUE, Message::new(body)).await.unwrap();
    }
    let (shutdown, handle) = pipeline.start();

    pipeline.settled(3).await;

    assert_eq!(pipeline.broker.rejected_count(QUEUE), 3);
    assert_eq!(pipeline.broker.ready_count(QUEUE), 0);
    assert!(pipeline.callback.delivered.lock().unwrap().is_empty());

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_unknown_user_is_dropped() {
    let pipeline = Pipeline::new();
    let connection = pipeline.broker.connect().await.unwrap();
    let dispatcher = TaskDispatcher::new(connection, QUEUE);
    let (shutdown, handle) = pipeline.start();

    assert!(dispatcher.submit(&TaskDescriptor::new(3, 404, 5)).await);
    pipeline.settled(1).await;

    assert_eq!(pipeline.broker.rejected_count(QUEUE), 1);
    assert!(pipeline.callback.delivered.lock().unwrap().is_empty());

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}
