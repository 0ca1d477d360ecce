use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{NewTaskData, Task};
use crate::repository::{ensure_valid_id, TaskRepository, TaskSearch};
use async_trait::async_trait;
use sqlx::QueryBuilder;

const SELECT_TASKS: &str = "SELECT id, date, title, comment, repeat FROM scheduler";

/// SQLite implementation of [`TaskRepository`].
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Escapes `LIKE` wildcards so user text is matched literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl TaskRepository for SqliteRepository {
    async fn create(&self, data: &NewTaskData) -> Result<i64, CoreError> {
        let result = sqlx::query(
            r#"INSERT INTO scheduler (date, title, comment, repeat)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&data.date)
        .bind(&data.title)
        .bind(&data.comment)
        .bind(&data.repeat)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_TASKS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list(&self, limit: i64, search: &str) -> Result<Vec<Task>, CoreError> {
        let mut query_builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(SELECT_TASKS);

        match TaskSearch::parse(search) {
            TaskSearch::All => {}
            TaskSearch::Date(date) => {
                query_builder.push(" WHERE date = ");
                query_builder.push_bind(date);
            }
            TaskSearch::Text(text) => {
                let pattern = like_pattern(&text);
                query_builder.push(" WHERE title LIKE ");
                query_builder.push_bind(pattern.clone());
                query_builder.push(" ESCAPE '\\' OR comment LIKE ");
                query_builder.push_bind(pattern);
                query_builder.push(" ESCAPE '\\'");
            }
        }

        query_builder.push(" ORDER BY date ASC, id ASC");
        if limit > 0 {
            query_builder.push(" LIMIT ");
            query_builder.push_bind(limit);
        }

        let tasks = query_builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), CoreError> {
        ensure_valid_id(task.id)?;

        let result = sqlx::query(
            r#"UPDATE scheduler
            SET date = $1, title = $2, comment = $3, repeat = $4
            WHERE id = $5
            "#,
        )
        .bind(&task.date)
        .bind(&task.title)
        .bind(&task.comment)
        .bind(&task.repeat)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(task.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), CoreError> {
        ensure_valid_id(id)?;

        let result = sqlx::query("DELETE FROM scheduler WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update_date(&self, id: i64, next: &str) -> Result<(), CoreError> {
        ensure_valid_id(id)?;
        if next.is_empty() {
            return Err(CoreError::InvalidInput("date is required".to_string()));
        }

        let result = sqlx::query("UPDATE scheduler SET date = $1 WHERE id = $2")
            .bind(next)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
