use chrono::NaiveDate;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use scheduler_core::models::{parse_canonical_date, Task, DISPLAY_DATE_FORMAT};

/// Renders a canonical date as DD.MM.YYYY, leaving unparsable input as is.
pub fn display_date(canonical: &str) -> String {
    parse_canonical_date(canonical)
        .map(|date| date.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| canonical.to_string())
}

fn date_cell(task: &Task, today: NaiveDate) -> Cell {
    let cell = Cell::new(display_date(&task.date));
    match parse_canonical_date(&task.date) {
        Some(date) if date < today => cell.fg(Color::Red), // Overdue
        Some(date) if date == today => cell.fg(Color::Yellow),
        _ => cell,
    }
}

pub fn display_tasks(tasks: &[Task], today: NaiveDate) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Title", "Comment", "Repeat"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(task.id));
        row.add_cell(date_cell(task, today));

        let title_cell = if task.is_recurring() {
            Cell::new(format!("↻ {}", task.title))
        } else {
            Cell::new(&task.title).add_attribute(Attribute::Bold)
        };
        row.add_cell(title_cell);

        row.add_cell(Cell::new(&task.comment));
        row.add_cell(if task.is_recurring() {
            Cell::new(&task.repeat).fg(Color::Cyan)
        } else {
            Cell::new("None").fg(Color::DarkGrey)
        });
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_task(task: &Task, today: NaiveDate) {
    let mut table = Table::new();
    table.add_row(vec![Cell::new("ID"), Cell::new(task.id)]);
    table.add_row(vec![Cell::new("Title"), Cell::new(&task.title)]);
    table.add_row(vec![Cell::new("Date"), date_cell(task, today)]);
    table.add_row(vec![
        Cell::new("Comment"),
        Cell::new(if task.comment.is_empty() { "None" } else { task.comment.as_str() }),
    ]);
    table.add_row(vec![
        Cell::new("Repeat"),
        Cell::new(if task.is_recurring() { task.repeat.as_str() } else { "None" }),
    ]);
    println!("{table}");
}
