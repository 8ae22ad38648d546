use std::collections::HashMap;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskboard_core::board::Board;
use taskboard_core::config::{Palette, ThemeTokens};
use taskboard_core::dates;
use taskboard_core::deadline::{DeadlineWarning, WarningKind};
use taskboard_core::error::AppError;
use taskboard_core::model::{Comment, Customer, Task, TaskId, User};
use time::macros::format_description;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: TaskId,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Resolver")]
    resolver: String,
    #[tabled(rename = "Comments")]
    comments: usize,
}

#[derive(Tabled)]
struct CommentRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Posted")]
    posted: String,
    #[tabled(rename = "Comment")]
    content: String,
}

#[derive(Tabled)]
struct PersonRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
}

fn or_dash(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| "-".to_string())
}

fn warning_index(warnings: &[DeadlineWarning]) -> HashMap<TaskId, WarningKind> {
    warnings
        .iter()
        .map(|warning| (warning.task_id, warning.kind))
        .collect()
}

/// `YYYY-MM-DD` for readable dates, the raw value otherwise.
pub fn short_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "-".to_string();
    };
    let format = format_description!("[year]-[month]-[day]");
    dates::parse_moment(raw)
        .ok()
        .and_then(|moment| moment.format(&format).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn due_cell(task: &Task, marks: &HashMap<TaskId, WarningKind>) -> String {
    let due = short_date(task.tobe_completed_date.as_deref());
    match marks.get(&task.id) {
        Some(WarningKind::Overdue) => format!("{due} (overdue)"),
        Some(WarningKind::Approaching) => format!("{due} (soon)"),
        None => due,
    }
}

fn task_row(task: &Task, marks: &HashMap<TaskId, WarningKind>) -> TaskRow {
    TaskRow {
        id: task.id,
        description: task.issue_description.clone(),
        priority: task.priority.to_string(),
        status: task.status.to_string(),
        due: due_cell(task, marks),
        customer: task
            .customer
            .as_ref()
            .map(|customer| customer.name.clone().unwrap_or_else(|| format!("#{}", customer.id)))
            .unwrap_or_else(|| "-".to_string()),
        resolver: task
            .resolver
            .as_ref()
            .map(|user| user.username.clone().unwrap_or_else(|| format!("#{}", user.id)))
            .unwrap_or_else(|| "-".to_string()),
        comments: task.comments.len(),
    }
}

pub fn board_text(board: &Board, warnings: &[DeadlineWarning], palette: &Palette) -> String {
    let marks = warning_index(warnings);
    let mut sections = Vec::with_capacity(board.columns().len());

    for column in board.columns() {
        let heading = palette.accentize(&format!("{} ({})", column.status, column.tasks.len()));
        let body = if column.tasks.is_empty() {
            palette.mutedize("  no tasks")
        } else {
            let rows: Vec<TaskRow> = column.tasks.iter().map(|task| task_row(task, &marks)).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        };
        sections.push(format!("{heading}\n{body}"));
    }

    sections.join("\n\n")
}

pub fn tasks_text(tasks: &[Task], warnings: &[DeadlineWarning], palette: &Palette) -> String {
    if tasks.is_empty() {
        return palette.mutedize("No tasks found");
    }
    let marks = warning_index(warnings);
    let rows: Vec<TaskRow> = tasks.iter().map(|task| task_row(task, &marks)).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn task_detail_text(task: &Task, warnings: &[DeadlineWarning], palette: &Palette) -> String {
    let marks = warning_index(warnings);
    let row = task_row(task, &marks);
    let mut lines = vec![
        palette.accentize(&format!("#{} {}", task.id, task.issue_description)),
        format!("Status:     {}", row.status),
        format!("Priority:   {}", row.priority),
        format!("Issued:     {}", short_date(task.issue_date.as_deref())),
        format!("Due:        {}", row.due),
        format!("Completed:  {}", short_date(task.actual_complete_date.as_deref())),
        format!("Customer:   {}", row.customer),
        format!("Resolver:   {}", row.resolver),
    ];
    if let Some(notes) = task.notes.as_deref() {
        lines.push(format!("Notes:      {notes}"));
    }
    lines.push(String::new());
    lines.push(comments_text(&task.comments, palette));
    lines.join("\n")
}

pub fn comments_text(comments: &[Comment], palette: &Palette) -> String {
    if comments.is_empty() {
        return palette.mutedize("No comments yet");
    }
    let rows: Vec<CommentRow> = comments
        .iter()
        .map(|comment| CommentRow {
            id: comment.id,
            author: comment
                .author
                .as_ref()
                .map(|user| user.username.clone().unwrap_or_else(|| format!("#{}", user.id)))
                .unwrap_or_else(|| "-".to_string()),
            posted: short_date(comment.created_at.as_deref()),
            content: comment.content.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn customers_text(customers: &[Customer], palette: &Palette) -> String {
    if customers.is_empty() {
        return palette.mutedize("No customers found");
    }
    let rows: Vec<PersonRow> = customers
        .iter()
        .map(|customer| PersonRow {
            id: customer.id,
            name: or_dash(customer.name.as_ref()),
            email: or_dash(customer.email.as_ref()),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn users_text(users: &[User], palette: &Palette) -> String {
    if users.is_empty() {
        return palette.mutedize("No users found");
    }
    let rows: Vec<PersonRow> = users
        .iter()
        .map(|user| PersonRow {
            id: user.id,
            name: or_dash(user.username.as_ref()),
            email: or_dash(user.email.as_ref()),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn warnings_text(warnings: &[DeadlineWarning], palette: &Palette) -> String {
    if warnings.is_empty() {
        return palette.mutedize("No deadline warnings");
    }
    warnings
        .iter()
        .map(|warning| format!("{}: {}", palette.accentize(warning.title()), warning.body()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn theme_text(tokens: &ThemeTokens, palette: &Palette) -> String {
    [
        format!("Mode:          {}", tokens.mode),
        format!("Color scheme:  {}", palette.accentize(tokens.color_scheme)),
        format!("Primary:       {}", tokens.primary),
        format!("Text:          {}", tokens.text),
        format!("Background:    {}", tokens.background),
        format!("Border radius: {}", tokens.border_radius),
        format!("Font family:   {}", tokens.font_family),
    ]
    .join("\n")
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{
        board_text, customers_text, short_date, task_detail_text, tasks_text, users_text,
        warnings_text,
    };
    use taskboard_core::board::Board;
    use taskboard_core::config::Palette;
    use taskboard_core::deadline::{DeadlineWarning, WarningKind};
    use taskboard_core::model::{Customer, Priority, Task, TaskStatus, User};

    fn task(id: u64, status: TaskStatus) -> Task {
        Task {
            id,
            issue_description: format!("task {id}"),
            notes: None,
            priority: Priority::High,
            status,
            issue_date: None,
            tobe_completed_date: Some("2026-10-13T00:00:00Z".to_string()),
            actual_complete_date: None,
            customer: None,
            resolver: None,
            comments: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn overdue(id: u64) -> DeadlineWarning {
        DeadlineWarning {
            task_id: id,
            description: format!("task {id}"),
            kind: WarningKind::Overdue,
            due: "2026-10-13T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn board_lists_every_column_in_order() {
        let board = Board::partition(vec![task(1, TaskStatus::InProgress)]);
        let text = board_text(&board, &[overdue(1)], &Palette::plain());

        let positions: Vec<_> = ["To Do (0)", "In Progress (1)", "Completed (0)", "Cancelled (0)"]
            .iter()
            .map(|heading| text.find(heading).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(text.contains("2026-10-13 (overdue)"));
        assert!(text.contains("no tasks"));
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(tasks_text(&[], &[], &Palette::plain()), "No tasks found");
    }

    #[test]
    fn detail_includes_comments_section() {
        let text = task_detail_text(&task(4, TaskStatus::ToDo), &[], &Palette::plain());
        assert!(text.starts_with("#4 task 4"));
        assert!(text.contains("Priority:   High"));
        assert!(text.contains("No comments yet"));
    }

    #[test]
    fn short_date_keeps_unreadable_values() {
        assert_eq!(short_date(Some("2026-10-20")), "2026-10-20");
        assert_eq!(short_date(Some("someday")), "someday");
        assert_eq!(short_date(None), "-");
    }

    #[test]
    fn warnings_render_title_and_body() {
        let text = warnings_text(&[overdue(2)], &Palette::plain());
        assert_eq!(text, "Task Overdue: Task \"task 2\" is past its target date");
    }

    #[test]
    fn people_tables_fill_missing_fields_with_dashes() {
        let customers = [Customer {
            id: 3,
            name: Some("Lan".to_string()),
            email: None,
        }];
        let text = customers_text(&customers, &Palette::plain());
        assert!(text.contains("Lan"));
        assert!(text.contains("Email"));
        assert!(text.contains(" - "));

        assert_eq!(users_text(&[], &Palette::plain()), "No users found");
        let users = [User {
            id: 4,
            username: Some("mai".to_string()),
            email: Some("mai@example.com".to_string()),
        }];
        assert!(users_text(&users, &Palette::plain()).contains("mai@example.com"));
    }
}
