//! The Task Operation Surface: the six operations exposed to the
//! transport collaborator, each composed as gate → input validation →
//! store call. The gate runs first and short-circuits unconditionally; an
//! unauthenticated request never touches the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::gate::AccessGate;
use crate::store::{QueryMode, Task, TaskPatch, TaskStore};
use crate::verifier::TokenVerifier;

/// Stable external representation of a task. The field set is the same in
/// every response; `due_date` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub due_date: String,
    pub done: bool,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            done: task.done,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
}

/// Partial update payload; absent fields leave the record unchanged.
pub type UpdateTask = TaskPatch;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchTasks {
    #[serde(rename = "q")]
    pub query: String,
    /// Selects the raw-concatenation query path. Defaults to the safe,
    /// parameterized path when omitted.
    #[serde(rename = "unsafe", default)]
    pub unsafe_query: bool,
}

/// Binds the access gate and the task store into the operation set.
pub struct TaskApi {
    gate: AccessGate,
    store: Arc<dyn TaskStore>,
}

impl TaskApi {
    pub fn new(verifier: Arc<dyn TokenVerifier>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            gate: AccessGate::new(verifier),
            store,
        }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
        req: CreateTask,
    ) -> Result<TaskView> {
        self.gate.check(ctx, authorization).await?;
        if req.title.is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }
        let task = self
            .store
            .create(&req.title, &req.description, &req.due_date)
            .await?;
        tracing::info!(request_id = ctx.request_id(), task_id = %task.id, "task created");
        Ok(task.into())
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
    ) -> Result<Vec<TaskView>> {
        self.gate.check(ctx, authorization).await?;
        let tasks = self.store.list().await?;
        tracing::debug!(request_id = ctx.request_id(), count = tasks.len(), "tasks listed");
        Ok(tasks.into_iter().map(TaskView::from).collect())
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
        id: &str,
    ) -> Result<TaskView> {
        self.gate.check(ctx, authorization).await?;
        if id.is_empty() {
            return Err(Error::InvalidInput("task id is required".to_string()));
        }
        let task = self.store.get_by_id(id).await?;
        tracing::debug!(request_id = ctx.request_id(), task_id = id, "task retrieved");
        Ok(task.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
        id: &str,
        req: UpdateTask,
    ) -> Result<TaskView> {
        self.gate.check(ctx, authorization).await?;
        if id.is_empty() {
            return Err(Error::InvalidInput("task id is required".to_string()));
        }
        if let Some(title) = &req.title
            && title.is_empty()
        {
            return Err(Error::InvalidInput("title cannot be emptied".to_string()));
        }
        let task = self.store.update(id, req).await?;
        tracing::info!(request_id = ctx.request_id(), task_id = id, "task updated");
        Ok(task.into())
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
        id: &str,
    ) -> Result<()> {
        self.gate.check(ctx, authorization).await?;
        if id.is_empty() {
            return Err(Error::InvalidInput("task id is required".to_string()));
        }
        self.store.delete(id).await?;
        tracing::info!(request_id = ctx.request_id(), task_id = id, "task deleted");
        Ok(())
    }

    pub async fn search(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
        req: SearchTasks,
    ) -> Result<Vec<TaskView>> {
        self.gate.check(ctx, authorization).await?;
        if req.query.is_empty() {
            return Err(Error::InvalidInput(
                "search query parameter 'q' is required".to_string(),
            ));
        }
        tracing::info!(
            request_id = ctx.request_id(),
            query = %req.query,
            unsafe_query = req.unsafe_query,
            "searching tasks"
        );
        let tasks = self
            .store
            .search_by_title(&req.query, QueryMode::from_unsafe_flag(req.unsafe_query))
            .await?;
        Ok(tasks.into_iter().map(TaskView::from).collect())
    }
}
