//! The release task queue: a state machine over task records persisted in
//! the store, enforcing serialized, creation-ordered, failure-blocking
//! execution of release jobs.

use crate::config::Config;
use crate::consts::*;
use crate::dataset::{Dataset, Revisioner};
use crate::notify::{LogNotifier, Notifier};
use crate::store::SparqlClient;
use crate::term::{Binding, Term, Triple};
use crate::transfer::TransferEngine;
use crate::util::{datetime_literal, mint_resource, parse_datetime};
use anyhow::{anyhow, Result};
use chrono::prelude::*;
use log::{error, info, warn};

/// Lifecycle of a release task. There is no automated transition out of
/// `Failed`; an operator resets the record to `Ready` with the statement
/// from [`ReleaseQueue::recovery_statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Ready,
    Releasing,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn uri(&self) -> &'static str {
        match self {
            TaskStatus::Ready => STATUS_READY,
            TaskStatus::Releasing => STATUS_RELEASING,
            TaskStatus::Success => STATUS_SUCCESS,
            TaskStatus::Failed => STATUS_FAILED,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            STATUS_READY => Some(TaskStatus::Ready),
            STATUS_RELEASING => Some(TaskStatus::Releasing),
            STATUS_SUCCESS => Some(TaskStatus::Success),
            STATUS_FAILED => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Ready => write!(f, "ready"),
            TaskStatus::Releasing => write!(f, "releasing"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A persisted release job: one staging graph to publish.
#[derive(Debug, Clone)]
pub struct ReleaseTask {
    pub uri: String,
    pub uuid: String,
    pub source_graph: String,
    pub created: DateTime<Utc>,
    pub status: TaskStatus,
}

/// Owns all task records and drives the release pipeline. Every mutating
/// method takes `&mut self`: one queue value is the single writer for its
/// task records, and `worker::spawn` moves it onto one thread so the
/// check-then-act between guard and start stays race-free within the
/// process.
pub struct ReleaseQueue {
    client: Box<dyn SparqlClient>,
    config: Config,
    notifier: Box<dyn Notifier>,
}

impl ReleaseQueue {
    pub fn new(client: Box<dyn SparqlClient>, config: Config) -> Self {
        ReleaseQueue {
            client,
            config,
            notifier: Box::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn client(&self) -> &dyn SparqlClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn engine(&self) -> TransferEngine<'_> {
        TransferEngine::new(
            self.client.as_ref(),
            self.config.page_size,
            self.config.batch_size,
        )
    }

    /// Creates a `Ready` task for the staging graph.
    pub fn enqueue(&mut self, source_graph: &str) -> Result<ReleaseTask> {
        let (uri, uuid) = mint_resource(&self.config.resource_base_uri, "release-tasks");
        let task = ReleaseTask {
            uri: uri.clone(),
            uuid: uuid.clone(),
            source_graph: source_graph.to_string(),
            created: Utc::now(),
            status: TaskStatus::Ready,
        };
        let triples = vec![
            Triple::new(uri.clone(), RDF_TYPE, Term::uri(GP_RELEASE_TASK)),
            Triple::new(uri.clone(), DCT_IDENTIFIER, Term::literal(uuid)),
            Triple::new(
                uri.clone(),
                GP_SOURCE_GRAPH,
                Term::uri(source_graph.to_string()),
            ),
            Triple::new(uri.clone(), DCT_CREATED, datetime_literal(&task.created)),
            Triple::new(uri, ADMS_STATUS, Term::uri(task.status.uri())),
        ];
        self.engine().insert_batch(&triples, &self.config.tasks_graph)?;
        info!("enqueued release task {} for {}", task.uri, source_graph);
        Ok(task)
    }

    /// All task records, ordered by creation time.
    pub fn tasks(&self) -> Result<Vec<ReleaseTask>> {
        let query = format!(
            "SELECT ?task ?uuid ?graph ?created ?status WHERE {{ GRAPH <{}> {{ \
             ?task <{}> <{}> ; <{}> ?uuid ; <{}> ?graph ; <{}> ?created ; <{}> ?status \
             }} }} ORDER BY ASC(?created)",
            self.config.tasks_graph,
            RDF_TYPE,
            GP_RELEASE_TASK,
            DCT_IDENTIFIER,
            GP_SOURCE_GRAPH,
            DCT_CREATED,
            ADMS_STATUS,
        );
        self.client
            .select(&query)?
            .iter()
            .map(task_from_binding)
            .collect()
    }

    fn count_with_status(&self, status: TaskStatus) -> Result<usize> {
        let query = format!(
            "SELECT (COUNT(?task) AS ?count) WHERE {{ GRAPH <{}> {{ \
             ?task <{}> <{}> ; <{}> <{}> }} }}",
            self.config.tasks_graph,
            RDF_TYPE,
            GP_RELEASE_TASK,
            ADMS_STATUS,
            status.uri(),
        );
        let rows = self.client.select(&query)?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .ok_or_else(|| anyhow!("count query returned no ?count"))?;
        Ok(count.value().parse()?)
    }

    /// The earliest-created `Ready` task, or `None` when the queue is
    /// blocked. A single `Failed` task halts all future releases: datasets
    /// must be published in creation order, so skipping a failed task would
    /// violate ordering. A `Releasing` task likewise blocks selection.
    pub fn next_eligible_task(&self) -> Result<Option<ReleaseTask>> {
        if self.count_with_status(TaskStatus::Failed)? > 0 {
            warn!("a failed release task is blocking the queue; operator action required");
            return Ok(None);
        }
        if self.count_with_status(TaskStatus::Releasing)? > 0 {
            info!("a release is already in progress; not starting another");
            return Ok(None);
        }
        let query = format!(
            "SELECT ?task ?uuid ?graph ?created ?status WHERE {{ GRAPH <{}> {{ \
             ?task <{}> <{}> ; <{}> ?uuid ; <{}> ?graph ; <{}> ?created ; <{}> ?status . \
             FILTER(?status = <{}>) \
             }} }} ORDER BY ASC(?created) LIMIT 1",
            self.config.tasks_graph,
            RDF_TYPE,
            GP_RELEASE_TASK,
            DCT_IDENTIFIER,
            GP_SOURCE_GRAPH,
            DCT_CREATED,
            ADMS_STATUS,
            TaskStatus::Ready.uri(),
        );
        let rows = self.client.select(&query)?;
        rows.first().map(task_from_binding).transpose()
    }

    fn set_status(&mut self, task_uri: &str, status: TaskStatus) -> Result<()> {
        info!("task {} -> {}", task_uri, status);
        self.client.update(&format!(
            "DELETE {{ GRAPH <{g}> {{ <{t}> <{p}> ?status }} }} \
             INSERT {{ GRAPH <{g}> {{ <{t}> <{p}> <{new}> }} }} \
             WHERE {{ GRAPH <{g}> {{ <{t}> <{p}> ?status }} }}",
            g = self.config.tasks_graph,
            t = task_uri,
            p = ADMS_STATUS,
            new = status.uri(),
        ))
    }

    /// The update an operator runs to re-open the queue after a failure.
    /// Exposed and printed, never executed by the engine itself.
    pub fn recovery_statement(&self, task_uri: &str) -> String {
        format!(
            "DELETE {{ GRAPH <{g}> {{ <{t}> <{p}> <{failed}> }} }} \
             INSERT {{ GRAPH <{g}> {{ <{t}> <{p}> <{ready}> }} }} \
             WHERE {{ GRAPH <{g}> {{ <{t}> <{p}> <{failed}> }} }}",
            g = self.config.tasks_graph,
            t = task_uri,
            p = ADMS_STATUS,
            failed = STATUS_FAILED,
            ready = STATUS_READY,
        )
    }

    /// Runs the release pipeline for one task. Only a `Ready` task may be
    /// executed; a finished task's staging graph is already consumed, so
    /// re-running it would publish an empty release. Pipeline errors are
    /// contained here: the task is marked `Failed`, the operator is notified
    /// with the exact recovery statement, and the error does not propagate.
    /// Only a failure to persist the status itself bubbles up.
    pub fn execute(&mut self, task: &ReleaseTask) -> Result<TaskStatus> {
        if task.status != TaskStatus::Ready {
            return Err(anyhow!(
                "task {} is {}, not ready; refusing to execute it",
                task.uri,
                task.status
            ));
        }
        self.set_status(&task.uri, TaskStatus::Releasing)?;
        match self.run_release(task) {
            Ok(dataset) => {
                self.set_status(&task.uri, TaskStatus::Success)?;
                info!(
                    "release task {} published dataset {} from {}",
                    task.uri, dataset.uri, task.source_graph
                );
                Ok(TaskStatus::Success)
            }
            Err(err) => {
                error!("release task {} failed: {:#}", task.uri, err);
                self.set_status(&task.uri, TaskStatus::Failed)?;
                let body = format!(
                    "Release of {} failed: {:#}\n\n\
                     The queue is halted until the task is reset. To re-open it, run:\n{}",
                    task.source_graph,
                    err,
                    self.recovery_statement(&task.uri)
                );
                self.notifier
                    .notify(&format!("Release task {} failed", task.uuid), &body);
                Ok(TaskStatus::Failed)
            }
        }
    }

    /// Drains the queue: selects and executes eligible tasks in creation
    /// order until none remain or one fails. Returns the number of tasks
    /// executed. An explicit loop rather than self-chaining recursion keeps
    /// stack depth and failure attribution bounded.
    pub fn run_pending(&mut self) -> Result<usize> {
        let mut executed = 0;
        while let Some(task) = self.next_eligible_task()? {
            self.execute(&task)?;
            executed += 1;
        }
        Ok(executed)
    }

    fn run_release(&self, task: &ReleaseTask) -> Result<Dataset> {
        let revisioner = Revisioner::new(self.client.as_ref(), &self.config)?;
        let mut dataset = revisioner.prepare(&task.source_graph)?;
        revisioner.deprecate_previous(&mut dataset, &task.source_graph)?;
        revisioner.release(&task.source_graph)?;
        Ok(dataset)
    }
}

fn task_from_binding(binding: &Binding) -> Result<ReleaseTask> {
    let get = |name: &str| -> Result<&Term> {
        binding
            .get(name)
            .ok_or_else(|| anyhow!("task binding is missing ?{}", name))
    };
    let status_uri = get("status")?.value();
    let status = TaskStatus::from_uri(status_uri)
        .ok_or_else(|| anyhow!("unknown task status {}", status_uri))?;
    let created_value = get("created")?.value();
    let created = parse_datetime(created_value)
        .ok_or_else(|| anyhow!("unparseable task creation time {}", created_value))?;
    Ok(ReleaseTask {
        uri: get("task")?.value().to_string(),
        uuid: get("uuid")?.value().to_string(),
        source_graph: get("graph")?.value().to_string(),
        created,
        status,
    })
}
