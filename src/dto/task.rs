use crate::domain;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Task priority as written on the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub enum TaskPriority {
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Média")]
    Medium,
    #[serde(rename = "Baixa")]
    Low,
}

impl From<TaskPriority> for domain::task::TaskPriority {
    fn from(value: TaskPriority) -> Self {
        match value {
            TaskPriority::High => Self::High,
            TaskPriority::Medium => Self::Medium,
            TaskPriority::Low => Self::Low,
        }
    }
}

impl From<domain::task::TaskPriority> for TaskPriority {
    fn from(value: domain::task::TaskPriority) -> Self {
        match value {
            domain::task::TaskPriority::High => Self::High,
            domain::task::TaskPriority::Medium => Self::Medium,
            domain::task::TaskPriority::Low => Self::Low,
        }
    }
}

/// Task status as written on the API. Spaces are replaced by underscores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub enum TaskStatus {
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Em_Progresso")]
    InProgress,
    #[serde(rename = "Concluído")]
    Completed,
}

impl From<TaskStatus> for domain::task::TaskStatus {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Completed => Self::Completed,
        }
    }
}

impl From<domain::task::TaskStatus> for TaskStatus {
    fn from(value: domain::task::TaskStatus) -> Self {
        match value {
            domain::task::TaskStatus::Pending => Self::Pending,
            domain::task::TaskStatus::InProgress => Self::InProgress,
            domain::task::TaskStatus::Completed => Self::Completed,
        }
    }
}

/// Priority and status of a task, passed in the query string when creating or updating it
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[cfg_attr(test, derive(Serialize))]
pub struct TaskClassification {
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// DTO for the editable text and deadline of a task, used for both creation and updates
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct TaskBody {
    #[schema(example = "Implementar API")]
    #[validate(length(min = 1, max = 50))]
    pub title: String,
    #[schema(example = "Desenvolver endpoints da aplicação")]
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    /// Days allotted to the task from its creation date
    #[schema(example = 5)]
    #[validate(range(min = 1, max = 999))]
    pub deadline: i32,
}

/// Pairs a request body with its query-string classification
pub fn new_task(body: TaskBody, classification: TaskClassification) -> domain::task::NewTask {
    domain::task::NewTask {
        title: body.title,
        description: body.description,
        deadline_days: body.deadline,
        priority: classification.priority.into(),
        status: classification.status.into(),
    }
}

pub fn update_task(body: TaskBody, classification: TaskClassification) -> domain::task::UpdateTask {
    domain::task::UpdateTask {
        title: body.title,
        description: body.description,
        deadline_days: body.deadline,
        priority: classification.priority.into(),
        status: classification.status.into(),
    }
}

/// DTO for a newly created task
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct InsertedTask {
    #[schema(example = 5)]
    pub id: i32,
}

/// DTO for a returned task on the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq))]
pub struct Task {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Implementar API")]
    pub title: String,
    #[schema(example = "Desenvolver endpoints da aplicação")]
    pub description: String,
    pub priority: TaskPriority,
    #[schema(example = 5)]
    pub deadline: i32,
    pub status: TaskStatus,
    /// RFC 3339 timestamp carrying the service's configured offset
    #[schema(example = "2025-07-03T15:39:38-03:00")]
    pub created_at: String,
}

impl From<domain::task::Task> for Task {
    fn from(value: domain::task::Task) -> Self {
        Task {
            id: value.id,
            title: value.title,
            description: value.description,
            priority: value.priority.into(),
            deadline: value.deadline_days,
            status: value.status.into(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskPage {
    pub items: Vec<Task>,
    /// Tasks matching the filter across every page
    #[schema(example = 42)]
    pub total_count: i64,
}

impl From<domain::task::TaskPage> for TaskPage {
    fn from(value: domain::task::TaskPage) -> Self {
        TaskPage {
            items: value.items.into_iter().map(Task::from).collect(),
            total_count: value.total_count,
        }
    }
}

fn default_page_number() -> u32 {
    1
}

fn default_page_size() -> u32 {
    15
}

/// Page coordinates for listing tasks
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// 1-based page index
    #[serde(default = "default_page_number")]
    #[param(minimum = 1, default = 1)]
    #[validate(range(min = 1))]
    pub page_number: u32,
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 50, default = 15)]
    #[validate(range(min = 1, max = 50))]
    pub page_size: u32,
}

impl From<&PaginationQuery> for domain::task::PageRequest {
    fn from(value: &PaginationQuery) -> Self {
        domain::task::PageRequest {
            page_number: value.page_number,
            page_size: value.page_size,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct StatusSummary {
    #[schema(example = 3)]
    pub pending: i64,
    #[schema(example = 5)]
    pub in_progress: i64,
    #[schema(example = 7)]
    pub completed: i64,
    /// Completed tasks as a percentage of all counted tasks, rounded to two decimals
    #[schema(example = 46.67)]
    pub completion_percentage: f64,
}

impl From<domain::task::StatusSummary> for StatusSummary {
    fn from(value: domain::task::StatusSummary) -> Self {
        StatusSummary {
            pending: value.counts.pending,
            in_progress: value.counts.in_progress,
            completed: value.counts.completed,
            completion_percentage: value.completion_percentage,
        }
    }
}

/// An open high priority task and how many days it has left
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct HighPriorityTask {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Implementar API")]
    pub title: String,
    #[schema(example = "2025-07-03T15:39:38-03:00")]
    pub created_at: String,
    pub status: TaskStatus,
    /// Negative once the deadline has passed
    #[schema(example = 2)]
    pub days_remaining: i64,
}

impl From<domain::task::HighPriorityTask> for HighPriorityTask {
    fn from(value: domain::task::HighPriorityTask) -> Self {
        HighPriorityTask {
            id: value.id,
            title: value.title,
            created_at: value.created_at.to_rfc3339(),
            status: value.status.into(),
            days_remaining: value.days_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::test_util::sample_task;
    use speculoos::prelude::*;

    fn body() -> TaskBody {
        TaskBody {
            title: "Implementar API".to_owned(),
            description: "Desenvolver endpoints da aplicação".to_owned(),
            deadline: 5,
        }
    }

    mod task_body {
        use super::*;

        #[test]
        fn accepts_valid_body() {
            assert_that!(body().validate()).is_ok();
        }

        #[test]
        fn rejects_oversized_text_and_deadline() {
            let bad_body = TaskBody {
                title: (0..51).map(|_| "T").collect(),
                description: (0..201).map(|_| "D").collect(),
                deadline: 1000,
            };
            let validation_result = bad_body.validate();
            assert!(validation_result.is_err());
            let validation_errors = validation_result.unwrap_err();
            let field_validations = validation_errors.field_errors();
            assert!(field_validations.contains_key("title"));
            assert!(field_validations.contains_key("description"));
            assert!(field_validations.contains_key("deadline"));
        }

        #[test]
        fn rejects_empty_text_and_zero_deadline() {
            let bad_body = TaskBody {
                title: String::new(),
                description: String::new(),
                deadline: 0,
            };
            let validation_errors = bad_body.validate().expect_err("body should be invalid");
            assert_eq!(3, validation_errors.field_errors().len());
        }
    }

    mod pagination_query {
        use super::*;

        #[test]
        fn defaults_when_absent() {
            let query: PaginationQuery =
                serde_json::from_str("{}").expect("empty query should deserialize");
            assert_eq!(1, query.page_number);
            assert_eq!(15, query.page_size);
            assert_that!(query.validate()).is_ok();
        }

        #[test]
        fn rejects_out_of_range_values() {
            let zero_page = PaginationQuery {
                page_number: 0,
                page_size: 10,
            };
            assert_that!(zero_page.validate()).is_err();

            let huge_page = PaginationQuery {
                page_number: 1,
                page_size: 51,
            };
            assert_that!(huge_page.validate()).is_err();
        }
    }

    mod wire_enums {
        use super::*;

        #[test]
        fn use_portuguese_wire_names() {
            let classification: TaskClassification =
                serde_json::from_str(r#"{"priority": "Média", "status": "Em_Progresso"}"#)
                    .expect("classification should deserialize");
            assert_eq!(TaskPriority::Medium, classification.priority);
            assert_eq!(TaskStatus::InProgress, classification.status);

            assert_that!(serde_json::from_str::<TaskStatus>(r#""Em Progresso""#)).is_err();
            assert_that!(serde_json::from_str::<TaskStatus>(r#""Todas""#)).is_err();
        }
    }

    #[test]
    fn maps_domain_task_for_the_api() {
        let task = Task::from(sample_task(3, 1));

        assert_eq!(
            Task {
                id: 3,
                title: "Implementar API".to_owned(),
                description: "Desenvolver endpoints da aplicação".to_owned(),
                priority: TaskPriority::High,
                deadline: 5,
                status: TaskStatus::Pending,
                created_at: "2025-07-03T15:39:38-03:00".to_owned(),
            },
            task
        );
    }

    #[test]
    fn combines_body_and_classification() {
        let created = new_task(
            body(),
            TaskClassification {
                priority: TaskPriority::Low,
                status: TaskStatus::Completed,
            },
        );

        assert_eq!(domain::task::TaskPriority::Low, created.priority);
        assert_eq!(domain::task::TaskStatus::Completed, created.status);
        assert_eq!(5, created.deadline_days);
    }
}
