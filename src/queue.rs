//! Publish/subscribe integration. The broker is an external collaborator
//! behind a trait; this module only owns the worker tasks around it. The
//! workers share nothing with per-request dispatch state.

use crate::error::AppError;
use crate::model::Record;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError>;

    /// Deliver messages for `topic` on the returned channel until disconnect.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, AppError>;

    async fn disconnect(&self);
}

/// Producer closure, run once at startup; its payload is published to the topic.
pub type PublishFn = Arc<dyn Fn() -> Result<Record, AppError> + Send + Sync>;

/// Consumer closure, invoked per received payload.
pub type SubscribeFn = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

pub struct Publication {
    pub topic: String,
    pub f: PublishFn,
}

pub struct Subscription {
    pub topic: String,
    pub f: SubscribeFn,
}

/// Registered publications and subscriptions over one broker connection.
pub struct Messaging {
    broker: Arc<dyn MessageBroker>,
    publications: Vec<Publication>,
    subscriptions: Vec<Subscription>,
}

impl Messaging {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Messaging {
            broker,
            publications: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn add_publisher(&mut self, topic: impl Into<String>, f: PublishFn) {
        let topic = topic.into();
        tracing::info!(topic = %topic, "publisher registered");
        self.publications.push(Publication { topic, f });
    }

    pub fn add_subscriber(&mut self, topic: impl Into<String>, f: SubscribeFn) {
        let topic = topic.into();
        tracing::info!(topic = %topic, "subscriber registered");
        self.subscriptions.push(Subscription { topic, f });
    }

    pub fn broker(&self) -> &Arc<dyn MessageBroker> {
        &self.broker
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty() && self.subscriptions.is_empty()
    }

    /// One task per registration. Subscription loops exit when the shutdown
    /// channel flips or the broker closes the stream; publications run their
    /// producer once and publish the result.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.subscriptions.len() + self.publications.len());

        for sub in &self.subscriptions {
            let broker = self.broker.clone();
            let topic = sub.topic.clone();
            let f = sub.f.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                let mut rx = match broker.subscribe(&topic).await {
                    Ok(rx) => rx,
                    Err(e) => {
                        tracing::error!(topic = %topic, error = %e, "subscribe failed");
                        return;
                    }
                };
                tracing::info!(topic = %topic, "subscribed");
                loop {
                    tokio::select! {
                        msg = rx.recv() => match msg {
                            Some(payload) => f(payload),
                            None => break,
                        },
                        _ = shutdown.changed() => break,
                    }
                }
                tracing::info!(topic = %topic, "subscriber stopped");
            }));
        }

        for publication in &self.publications {
            let broker = self.broker.clone();
            let topic = publication.topic.clone();
            let f = publication.f.clone();
            handles.push(tokio::spawn(async move {
                let payload = match f() {
                    Ok(record) => match serde_json::to_vec(&record) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::error!(topic = %topic, error = %e, "encode publication");
                            return;
                        }
                    },
                    Err(e) => {
                        tracing::error!(topic = %topic, error = %e, "publication producer failed");
                        return;
                    }
                };
                if let Err(e) = broker.publish(&topic, payload).await {
                    tracing::error!(topic = %topic, error = %e, "publish failed");
                }
            }));
        }

        handles
    }
}

impl std::fmt::Debug for Messaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messaging")
            .field("publications", &self.publications.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct ChannelBroker {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        feed: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    }

    #[async_trait]
    impl MessageBroker for ChannelBroker {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
            self.published.lock().unwrap().push((topic.into(), payload));
            Ok(())
        }
        async fn subscribe(&self, _topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, AppError> {
            self.feed
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| AppError::Internal("already subscribed".into()))
        }
        async fn disconnect(&self) {}
    }

    #[tokio::test]
    async fn publication_runs_once_and_publishes() {
        let broker = Arc::new(ChannelBroker {
            published: Mutex::new(Vec::new()),
            feed: Mutex::new(None),
        });
        let mut messaging = Messaging::new(broker.clone());
        messaging.add_publisher("sensors", Arc::new(|| Ok(json!({"reading": 7}))));

        let (_tx, rx) = watch::channel(false);
        for handle in messaging.spawn(rx) {
            handle.await.unwrap();
        }
        let published = broker.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "sensors");
        assert_eq!(published[0].1, serde_json::to_vec(&json!({"reading": 7})).unwrap());
    }

    #[tokio::test]
    async fn subscriber_receives_until_shutdown() {
        let (feed_tx, feed_rx) = mpsc::channel(4);
        let broker = Arc::new(ChannelBroker {
            published: Mutex::new(Vec::new()),
            feed: Mutex::new(Some(feed_rx)),
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut messaging = Messaging::new(broker);
        let sink = seen.clone();
        messaging.add_subscriber(
            "sensors",
            Arc::new(move |payload| sink.lock().unwrap().push(payload)),
        );

        let (tx, rx) = watch::channel(false);
        let handles = messaging.spawn(rx);
        feed_tx.send(b"one".to_vec()).await.unwrap();
        feed_tx.send(b"two".to_vec()).await.unwrap();
        for _ in 0..200 {
            if seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![b"one".to_vec(), b"two".to_vec()]);
    }
}
