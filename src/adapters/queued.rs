//! Queued-task adapter.
//!
//! Probes the worker control plane before enqueuing so a submission never
//! disappears into a queue nobody is draining. Success means "delivery
//! handed off": the task result is not awaited and execution is not
//! guaranteed from here.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    adapters::{Adapter, AdapterName},
    config::QueueConfig,
    error::SendError,
    message::{EmailPayload, SendResult},
    render::TemplateRenderer,
};

/// A fire-and-forget task handed to the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSubmission {
    /// Task name the workers dispatch on.
    pub task: String,
    /// Positional arguments: recipient, subject, body.
    pub args: Vec<String>,
    /// Named queue the task is routed to.
    pub queue: String,
    /// The result is not collected; delivery is out of band.
    pub ignore_result: bool,
}

/// Task-queue control plane and submission client.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Liveness probe with a bounded timeout. Returns the list of workers
    /// that responded; an empty list means no workers are draining the
    /// queue.
    async fn ping(&self, timeout: Duration) -> anyhow::Result<Vec<String>>;

    /// Submit a task without awaiting its result.
    async fn submit(&self, submission: TaskSubmission) -> anyhow::Result<()>;
}

pub struct QueuedAdapter {
    queue: Arc<dyn TaskQueue>,
    renderer: TemplateRenderer,
    config: QueueConfig,
}

impl QueuedAdapter {
    #[must_use]
    pub fn new(queue: Arc<dyn TaskQueue>, renderer: TemplateRenderer, config: QueueConfig) -> Self {
        Self {
            queue,
            renderer,
            config,
        }
    }
}

#[async_trait]
impl Adapter for QueuedAdapter {
    fn name(&self) -> AdapterName {
        AdapterName::Queued
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendResult, SendError> {
        // Probe first: enqueuing with no workers alive is a black hole.
        let responders = self
            .queue
            .ping(self.config.probe_timeout())
            .await
            .map_err(|err| {
                error!(error = %err, "task-queue liveness probe failed");
                SendError::Connectivity(format!("task-queue liveness probe failed: {err}"))
            })?;

        if responders.is_empty() {
            error!("no task workers responded to liveness probe");
            return Err(SendError::Connectivity(
                "no task workers available".to_string(),
            ));
        }

        let message = self
            .renderer
            .render(&payload.template_id, &payload.to, &payload.template_vars)?;

        let submission = TaskSubmission {
            task: self.config.task_name.clone(),
            args: vec![
                payload.to.to_string(),
                message.subject,
                message.body,
            ],
            queue: self.config.name.clone(),
            ignore_result: true,
        };

        self.queue.submit(submission).await.map_err(|err| {
            error!(error = %err, "task submission failed");
            SendError::Connectivity(format!("task submission failed: {err}"))
        })?;

        info!(to = %payload.to, queue = %self.config.name, "email task enqueued");
        Ok(SendResult::handed_off(AdapterName::Queued))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;
    use crate::message::DeliveryGuarantee;

    enum PingBehavior {
        Respond(Vec<String>),
        Fail,
    }

    struct FakeQueue {
        ping: PingBehavior,
        submit_fails: bool,
        submissions: Mutex<Vec<TaskSubmission>>,
    }

    impl FakeQueue {
        fn responding() -> Self {
            Self {
                ping: PingBehavior::Respond(vec!["worker@host".to_string()]),
                submit_fails: false,
                submissions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TaskQueue for FakeQueue {
        async fn ping(&self, _timeout: Duration) -> anyhow::Result<Vec<String>> {
            match &self.ping {
                PingBehavior::Respond(workers) => Ok(workers.clone()),
                PingBehavior::Fail => Err(anyhow::anyhow!("control plane unreachable")),
            }
        }

        async fn submit(&self, submission: TaskSubmission) -> anyhow::Result<()> {
            if self.submit_fails {
                return Err(anyhow::anyhow!("broker rejected the task"));
            }
            self.submissions.lock().unwrap().push(submission);
            Ok(())
        }
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(
            "test-sender@example.com".parse().unwrap(),
            "https://example.com",
        )
    }

    fn payload() -> EmailPayload {
        let vars: HashMap<_, _> = [("code", "123"), ("token", "abc")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EmailPayload::new("user@example.com", "verification", vars).unwrap()
    }

    fn adapter(queue: Arc<FakeQueue>) -> QueuedAdapter {
        QueuedAdapter::new(queue, renderer(), QueueConfig::default())
    }

    #[tokio::test]
    async fn enqueues_rendered_message() {
        let queue = Arc::new(FakeQueue::responding());
        let res = adapter(Arc::clone(&queue)).send(&payload()).await.unwrap();

        assert!(res.ok);
        assert_eq!(res.adapter, AdapterName::Queued);
        // Success here is hand-off, not confirmed delivery.
        assert_eq!(res.guarantee, DeliveryGuarantee::HandedOff);

        let submissions = queue.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        let task = &submissions[0];
        assert_eq!(task.task, "send_email_generic");
        assert_eq!(task.queue, "email");
        assert!(task.ignore_result);
        assert_eq!(task.args[0], "user@example.com");

        let expected = renderer()
            .render("verification", &payload().to, &payload().template_vars)
            .unwrap();
        assert_eq!(task.args[1], expected.subject);
        assert_eq!(task.args[2], expected.body);
    }

    #[tokio::test]
    async fn fails_when_no_workers_respond() {
        let queue = Arc::new(FakeQueue {
            ping: PingBehavior::Respond(Vec::new()),
            submit_fails: false,
            submissions: Mutex::new(Vec::new()),
        });
        let err = adapter(Arc::clone(&queue)).send(&payload()).await.unwrap_err();

        assert!(err.is_connectivity());
        assert!(err.to_string().contains("no task workers"));
        // Nothing was enqueued into the black hole.
        assert!(queue.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wraps_probe_errors() {
        let queue = Arc::new(FakeQueue {
            ping: PingBehavior::Fail,
            submit_fails: false,
            submissions: Mutex::new(Vec::new()),
        });
        let err = adapter(queue).send(&payload()).await.unwrap_err();

        assert!(err.is_connectivity());
        assert!(err.to_string().contains("liveness probe failed"));
        assert!(err.to_string().contains("control plane unreachable"));
    }

    #[tokio::test]
    async fn propagates_submission_errors() {
        let queue = Arc::new(FakeQueue {
            ping: PingBehavior::Respond(vec!["worker@host".to_string()]),
            submit_fails: true,
            submissions: Mutex::new(Vec::new()),
        });
        let err = adapter(queue).send(&payload()).await.unwrap_err();
        assert!(err.to_string().contains("broker rejected the task"));
    }
}
