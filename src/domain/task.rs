use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::TaskError;
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::cmp::Ordering;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Text form kept in the database
    pub fn as_stored_str(&self) -> &'static str {
        match self {
            Self::High => "Alta",
            Self::Medium => "Média",
            Self::Low => "Baixa",
        }
    }

    pub fn from_stored_str(stored: &str) -> Option<Self> {
        match stored {
            "Alta" => Some(Self::High),
            "Média" => Some(Self::Medium),
            "Baixa" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Progress of a task. Owners may move a task between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Display form kept in the database. The API uses an underscore in place of the space,
    /// see [TaskStatus::as_wire_str].
    pub fn as_stored_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::InProgress => "Em Progresso",
            Self::Completed => "Concluído",
        }
    }

    pub fn from_stored_str(stored: &str) -> Option<Self> {
        match stored {
            "Pendente" => Some(Self::Pending),
            "Em Progresso" => Some(Self::InProgress),
            "Concluído" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::InProgress => "Em_Progresso",
            Self::Completed => "Concluído",
        }
    }

    pub fn from_wire_str(wire: &str) -> Option<Self> {
        match wire {
            "Pendente" => Some(Self::Pending),
            "Em_Progresso" => Some(Self::InProgress),
            "Concluído" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Restricts a listing to tasks in one status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    /// Sentinel accepted on the wire for "no restriction"
    pub const ALL_SENTINEL: &'static str = "Todas";

    /// Parses the status filter used on the API. An empty filter or the "all" sentinel means
    /// no restriction; anything else has to be a status in wire form.
    pub fn from_wire_str(wire: &str) -> Option<Self> {
        let trimmed = wire.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(Self::ALL_SENTINEL)
            || trimmed.eq_ignore_ascii_case("all")
        {
            return Some(Self::All);
        }

        TaskStatus::from_wire_str(trimmed).map(Self::Only)
    }

    fn status(&self) -> Option<TaskStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(*status),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: i32,
    pub owner_user_id: i32,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    /// Days allotted to the task, counted from its creation date
    pub deadline_days: i32,
    pub status: TaskStatus,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub deadline_days: i32,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// Replacement values for every mutable field of a task
#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub deadline_days: i32,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// 1-based page coordinates. Bounds are enforced by the API before reaching the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page_number.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    pub items: Vec<Task>,
    /// Number of tasks matching the filter across all pages
    pub total_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl StatusCounts {
    /// Share of counted tasks that are completed, as a percentage rounded to two decimals with
    /// ties going to the even hundredth. Zero when there is nothing to count.
    pub fn completion_percentage(&self) -> f64 {
        let total = self.pending + self.in_progress + self.completed;
        if total == 0 {
            return 0.0;
        }

        // Work in hundredths of a percent so midpoints are detected exactly
        let scaled = self.completed * 10_000;
        let (hundredths, remainder) = (scaled / total, scaled % total);
        let rounded = match (remainder * 2).cmp(&total) {
            Ordering::Greater => hundredths + 1,
            Ordering::Equal if hundredths % 2 == 1 => hundredths + 1,
            _ => hundredths,
        };

        rounded as f64 / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub counts: StatusCounts,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighPriorityTask {
    pub id: i32,
    pub title: String,
    pub created_at: DateTime<FixedOffset>,
    pub status: TaskStatus,
    /// Negative once the deadline has passed
    pub days_remaining: i64,
}

/// Days left on a task as of `today`: the allotted days minus the days elapsed since creation
pub fn days_remaining(deadline_days: i32, created_on: NaiveDate, today: NaiveDate) -> i64 {
    i64::from(deadline_days) - (today - created_on).num_days()
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// Owner of the task, or None if the task doesn't exist
        async fn task_owner(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<i32>, anyhow::Error>;

        async fn task_by_id(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;

        /// Every task the user owns, newest id first
        async fn tasks_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;

        /// One page of the user's tasks, newest id first, optionally restricted to one status
        async fn task_page_for_user(
            &self,
            user_id: i32,
            status: Option<TaskStatus>,
            page: &PageRequest,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<TaskPage, anyhow::Error>;

        async fn status_counts_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<StatusCounts, anyhow::Error>;

        /// High priority tasks which aren't completed, oldest id first
        async fn open_high_priority_tasks(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
    }

    pub trait TaskWriter {
        async fn create_task_for_user(
            &self,
            user_id: i32,
            new_task: &NewTask,
            created_at: DateTime<FixedOffset>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        async fn update_task(
            &self,
            task_id: i32,
            update: &UpdateTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        async fn delete_task(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("Operation not allowed: the task does not belong to the current user.")]
        NotOwnedByUser,
        #[error("The requested task does not exist.")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait TaskPort {
        async fn create_task(
            &self,
            user_id: i32,
            task: &NewTask,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<i32, TaskError>;
        async fn update_task(
            &self,
            user_id: i32,
            task_id: i32,
            update: &UpdateTask,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<(), TaskError>;
        async fn delete_task(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<(), TaskError>;
        async fn task_by_id(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Task, TaskError>;
        /// Fails with [TaskError::NotFound] when the user has no tasks at all
        async fn tasks_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn paged_tasks_for_user(
            &self,
            user_id: i32,
            page: &PageRequest,
            filter: StatusFilter,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskPage, TaskError>;
        async fn status_summary(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<StatusSummary, TaskError>;
        async fn open_high_priority_tasks(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<HighPriorityTask>, TaskError>;
    }
}

/// Checks that a task exists and belongs to the user before it's read or modified
async fn verify_task_owner(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_read: &impl TaskReader,
) -> Result<(), TaskError> {
    let owner = task_read
        .task_owner(task_id, ext_cxn)
        .await
        .context("checking task ownership")?;

    match owner {
        None => Err(TaskError::NotFound),
        Some(owner_id) if owner_id == user_id => Ok(()),
        Some(owner_id) => {
            info!("User {user_id} tried to access task {task_id} owned by user {owner_id}");
            Err(TaskError::NotOwnedByUser)
        }
    }
}

pub struct TaskService {
    /// Offset used to stamp creation times and to decide what "today" is
    pub utc_offset: FixedOffset,
}

impl TaskService {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self { utc_offset }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

impl driving_ports::TaskPort for TaskService {
    async fn create_task(
        &self,
        user_id: i32,
        task: &NewTask,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<i32, TaskError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting task creation")?;

        let created_task_id = task_write
            .create_task_for_user(user_id, task, self.now(), &mut txn)
            .await
            .context("creating a task")?;

        txn.commit().await.context("saving new task")?;
        Ok(created_task_id)
    }

    async fn update_task(
        &self,
        user_id: i32,
        task_id: i32,
        update: &UpdateTask,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<(), TaskError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting task update")?;

        verify_task_owner(user_id, task_id, &mut txn, task_read).await?;
        task_write
            .update_task(task_id, update, &mut txn)
            .await
            .context("updating a task")?;

        txn.commit().await.context("saving task update")?;
        Ok(())
    }

    async fn delete_task(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<(), TaskError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting task deletion")?;

        verify_task_owner(user_id, task_id, &mut txn, task_read).await?;
        task_write
            .delete_task(task_id, &mut txn)
            .await
            .context("deleting a task")?;

        txn.commit().await.context("saving task deletion")?;
        Ok(())
    }

    async fn task_by_id(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Task, TaskError> {
        verify_task_owner(user_id, task_id, &mut *ext_cxn, task_read).await?;

        let task = task_read
            .task_by_id(task_id, &mut *ext_cxn)
            .await
            .context("fetching a task by id")?;
        match task {
            Some(task) => Ok(task),
            None => {
                error!("Task {task_id} passed the ownership check but could not be loaded");
                Err(TaskError::NotFound)
            }
        }
    }

    async fn tasks_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks = task_read
            .tasks_for_user(user_id, ext_cxn)
            .await
            .context("fetching user tasks")?;
        if tasks.is_empty() {
            return Err(TaskError::NotFound);
        }

        Ok(tasks)
    }

    async fn paged_tasks_for_user(
        &self,
        user_id: i32,
        page: &PageRequest,
        filter: StatusFilter,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<TaskPage, TaskError> {
        let task_page = task_read
            .task_page_for_user(user_id, filter.status(), page, ext_cxn)
            .await
            .context("fetching a page of user tasks")?;

        Ok(task_page)
    }

    async fn status_summary(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<StatusSummary, TaskError> {
        let counts = task_read
            .status_counts_for_user(user_id, ext_cxn)
            .await
            .context("counting user tasks by status")?;

        Ok(StatusSummary {
            counts,
            completion_percentage: counts.completion_percentage(),
        })
    }

    async fn open_high_priority_tasks(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<HighPriorityTask>, TaskError> {
        let tasks = task_read
            .open_high_priority_tasks(user_id, ext_cxn)
            .await
            .context("fetching open high priority tasks")?;
        let today = self.now().date_naive();

        let mut high_priority: Vec<HighPriorityTask> = tasks
            .into_iter()
            .map(|task| HighPriorityTask {
                days_remaining: days_remaining(
                    task.deadline_days,
                    task.created_at.date_naive(),
                    today,
                ),
                id: task.id,
                title: task.title,
                created_at: task.created_at,
                status: task.status,
            })
            .collect();
        // Stable, so tasks sharing a status stay in id order. Pending sorts ahead of in progress.
        high_priority.sort_by(|first, second| {
            second
                .status
                .as_stored_str()
                .cmp(first.status.as_stored_str())
        });

        Ok(high_priority)
    }
}
