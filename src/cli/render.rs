use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Value, json};

use crate::summary::{Summary, deadline_status};
use crate::types::{Category, Task};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url regex"));

const DESCRIPTION_PREVIEW_CHARS: usize = 40;

pub(crate) fn redact_links(text: &str) -> String {
    URL_RE.replace_all(text, "[link]").into_owned()
}

pub(crate) fn task_json(task: &Task, today: NaiveDate) -> Value {
    json!({
        "id": task.id,
        "name": task.name,
        "description": task.description,
        "done": task.done,
        "pinned": task.pinned,
        "color": task.color,
        "emoji": task.emoji,
        "date": task.date,
        "deadline": task.deadline,
        "deadline_status": task.deadline.map(|deadline| deadline_status(deadline, today)),
        "categories": task.categories.iter().map(category_json).collect::<Vec<_>>(),
        "last_save": task.last_save,
        "created_at": task.created_at,
        "updated_at": task.updated_at
    })
}

pub(crate) fn category_json(category: &Category) -> Value {
    json!({
        "id": category.id,
        "name": category.name,
        "emoji": category.emoji,
        "color": category.color
    })
}

pub(crate) fn category_counts_json(counts: &[(Category, usize)]) -> Vec<Value> {
    counts
        .iter()
        .map(|(category, count)| {
            json!({
                "id": category.id,
                "name": category.name,
                "count": count
            })
        })
        .collect()
}

/// One line of filter chips, e.g. `Categories: Work (3)  Home (1)`.
pub(crate) fn render_category_chips(counts: &[(Category, usize)]) -> Option<String> {
    if counts.is_empty() {
        return None;
    }
    let chips = counts
        .iter()
        .map(|(category, count)| format!("{} ({count})", category.name.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("  ");
    Some(format!("Categories: {chips}"))
}

pub(crate) fn render_task_list_text(tasks: &[&Task], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let headers = ["ID", "State", "Name", "Deadline", "Categories"];
    let rows = tasks
        .iter()
        .map(|task| {
            vec![
                task.short_id(),
                state_label(task).to_string(),
                task.name.replace('\n', " "),
                deadline_label(task, today),
                category_labels(&task.categories),
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

pub(crate) fn render_task_detail(task: &Task, today: NaiveDate) -> String {
    let mut lines = vec![
        format!("{} {}", task.id, task.name),
        format!("  state:       {}", state_label(task)),
        format!("  created:     {}", task.date),
        format!("  deadline:    {}", deadline_label(task, today)),
        format!("  categories:  {}", category_labels(&task.categories)),
        format!("  color:       {}", task.color),
    ];
    if let Some(description) = task.description.as_deref() {
        lines.push(format!("  description: {}", description.replace('\n', " ")));
    }
    if let Some(last_save) = task.last_save {
        lines.push(format!("  last saved:  {}", last_save.to_rfc3339()));
    }
    lines.join("\n")
}

/// Text shown before a destructive action on one task.
pub(crate) fn render_delete_prompt(task: &Task) -> String {
    let mut prompt = format!("Delete task '{}'?", task.name);
    if let Some(description) = task.description.as_deref() {
        prompt.push_str(&format!(
            "\n  {}",
            preview(&redact_links(description), DESCRIPTION_PREVIEW_CHARS)
        ));
    }
    prompt
}

pub(crate) fn render_category_list_text(categories: &[Category], tasks: &[Task]) -> String {
    if categories.is_empty() {
        return "No categories found.".to_string();
    }

    let headers = ["ID", "Name", "Color", "Tasks"];
    let rows = categories
        .iter()
        .map(|category| {
            let used = tasks
                .iter()
                .filter(|task| task.has_category(&category.id))
                .count();
            vec![
                category.id.to_string(),
                category.name.replace('\n', " "),
                category.color.clone(),
                used.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

pub(crate) fn render_summary_text(summary: &Summary) -> String {
    if summary.total == 0 {
        return "No tasks yet.".to_string();
    }

    let mut lines = vec![format!(
        "{} of {} tasks done ({}%)",
        summary.done, summary.total, summary.percentage
    )];
    if summary.due_today.is_empty() {
        lines.push("Nothing due today.".to_string());
    } else {
        lines.push(format!("Due today: {}", summary.due_today.join(", ")));
    }
    if summary.overdue > 0 {
        lines.push(format!("{} overdue", summary.overdue));
    }
    lines.join("\n")
}

pub(crate) fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            if width > widths[index] {
                widths[index] = width;
            }
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let format_row = |cells: Vec<&str>| {
        format!(
            "| {} |",
            cells
                .iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join(" | ")
        )
    };

    let mut lines = vec![border.clone(), format_row(headers.to_vec()), border.clone()];
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.push(border);
    lines.join("\n")
}

fn state_label(task: &Task) -> &'static str {
    match (task.pinned, task.done) {
        (true, true) => "pinned, done",
        (true, false) => "pinned",
        (false, true) => "done",
        (false, false) => "open",
    }
}

fn deadline_label(task: &Task, today: NaiveDate) -> String {
    match task.deadline {
        Some(deadline) if task.done => deadline.to_string(),
        Some(deadline) => format!("{deadline} ({})", deadline_status(deadline, today)),
        None => "-".to_string(),
    }
}

fn category_labels(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "-".to_string();
    }
    categories
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let head: String = flattened.chars().take(max_chars).collect();
    format!("{head}...")
}
