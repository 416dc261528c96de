use super::{Count, NewId};
use crate::domain;
use crate::domain::task::{
    NewTask, PageRequest, StatusCounts, Task, TaskPage, TaskPriority, TaskStatus, UpdateTask,
};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error, anyhow};
use chrono::{DateTime, FixedOffset};
use sqlx::{FromRow, query, query_as};

const TASK_COLUMNS: &str =
    "tt.id, tt.user_id, tt.title, tt.description, tt.priority, tt.deadline_days, tt.status, tt.created_at";

pub struct DbTaskReader;

#[derive(FromRow)]
struct TodoTaskRow {
    id: i32,
    user_id: i32,
    title: String,
    description: String,
    priority: String,
    deadline_days: i32,
    status: String,
    created_at: String,
}

impl TryFrom<TodoTaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(value: TodoTaskRow) -> Result<Self, Self::Error> {
        let priority = TaskPriority::from_stored_str(&value.priority)
            .ok_or_else(|| anyhow!("task {} has unknown priority {}", value.id, value.priority))?;
        let status = TaskStatus::from_stored_str(&value.status)
            .ok_or_else(|| anyhow!("task {} has unknown status {}", value.id, value.status))?;
        let created_at = DateTime::parse_from_rfc3339(&value.created_at)
            .with_context(|| format!("parsing creation time of task {}", value.id))?;

        Ok(Task {
            id: value.id,
            owner_user_id: value.user_id,
            title: value.title,
            description: value.description,
            priority,
            deadline_days: value.deadline_days,
            status,
            created_at,
        })
    }
}

fn tasks_from_rows(rows: Vec<TodoTaskRow>) -> Result<Vec<Task>, Error> {
    rows.into_iter().map(Task::try_from).collect()
}

#[derive(FromRow)]
struct OwnerRow {
    user_id: i32,
}

#[derive(FromRow)]
struct StatusCountsRow {
    pending: i64,
    in_progress: i64,
    completed: i64,
}

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn task_owner(
        &self,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<i32>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let owner = query_as::<_, OwnerRow>("SELECT tt.user_id FROM todo_task tt WHERE tt.id = $1")
            .bind(task_id)
            .fetch_optional(cxn.borrow_connection())
            .await
            .context("trying to look up the owner of a task")?;

        Ok(owner.map(|row| row.user_id))
    }

    async fn task_by_id(
        &self,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let task_row = query_as::<_, TodoTaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM todo_task tt WHERE tt.id = $1"
        ))
        .bind(task_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a task by ID")?;

        task_row.map(Task::try_from).transpose()
    }

    async fn tasks_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let rows = query_as::<_, TodoTaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM todo_task tt WHERE tt.user_id = $1 ORDER BY tt.id DESC"
        ))
        .bind(user_id)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch tasks for a user")?;

        tasks_from_rows(rows)
    }

    async fn task_page_for_user(
        &self,
        user_id: i32,
        status: Option<TaskStatus>,
        page: &PageRequest,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<TaskPage, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;
        let stored_status = status.map(|status| status.as_stored_str());

        // Both statements share one connection, so they run one after the other
        let rows = query_as::<_, TodoTaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM todo_task tt \
             WHERE tt.user_id = $1 AND ($2::TEXT IS NULL OR tt.status = $2) \
             ORDER BY tt.id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(stored_status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch a page of tasks")?;

        let total = query_as::<_, Count>(
            "SELECT count(*) AS count FROM todo_task tt \
             WHERE tt.user_id = $1 AND ($2::TEXT IS NULL OR tt.status = $2)",
        )
        .bind(user_id)
        .bind(stored_status)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to count tasks matching a page filter")?;

        Ok(TaskPage {
            items: tasks_from_rows(rows)?,
            total_count: total.count(),
        })
    }

    async fn status_counts_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<StatusCounts, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let counts = query_as::<_, StatusCountsRow>(
            "SELECT \
                count(*) FILTER (WHERE tt.status = $2) AS pending, \
                count(*) FILTER (WHERE tt.status = $3) AS in_progress, \
                count(*) FILTER (WHERE tt.status = $4) AS completed \
             FROM todo_task tt WHERE tt.user_id = $1",
        )
        .bind(user_id)
        .bind(TaskStatus::Pending.as_stored_str())
        .bind(TaskStatus::InProgress.as_stored_str())
        .bind(TaskStatus::Completed.as_stored_str())
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to count tasks by status")?;

        Ok(StatusCounts {
            pending: counts.pending,
            in_progress: counts.in_progress,
            completed: counts.completed,
        })
    }

    async fn open_high_priority_tasks(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let rows = query_as::<_, TodoTaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM todo_task tt \
             WHERE tt.user_id = $1 AND tt.priority = $2 AND tt.status <> $3 \
             ORDER BY tt.id"
        ))
        .bind(user_id)
        .bind(TaskPriority::High.as_stored_str())
        .bind(TaskStatus::Completed.as_stored_str())
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch open high priority tasks")?;

        tasks_from_rows(rows)
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn create_task_for_user(
        &self,
        user_id: i32,
        new_task: &NewTask,
        created_at: DateTime<FixedOffset>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id = query_as::<_, NewId>(
            "INSERT INTO todo_task(user_id, title, description, priority, deadline_days, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING todo_task.id",
        )
        .bind(user_id)
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.priority.as_stored_str())
        .bind(new_task.deadline_days)
        .bind(new_task.status.as_stored_str())
        .bind(created_at.to_rfc3339())
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new task into the database")?;

        Ok(new_id.id)
    }

    async fn update_task(
        &self,
        task_id: i32,
        update: &UpdateTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "UPDATE todo_task SET title = $1, description = $2, priority = $3, deadline_days = $4, status = $5 \
             WHERE id = $6",
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.priority.as_stored_str())
        .bind(update.deadline_days)
        .bind(update.status.as_stored_str())
        .bind(task_id)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to update a task in the database")?;

        Ok(())
    }

    async fn delete_task(
        &self,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query("DELETE FROM todo_task WHERE id = $1")
            .bind(task_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a task from the database")?;

        Ok(())
    }
}
