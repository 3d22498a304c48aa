use sqlx::Row;
use vocab_core::model::{Question, QuestionType};

use super::SqliteRepository;
use super::mapping::{conn, question_id_from_i64, question_id_to_i64, ser};
use crate::repository::{QuestionRepository, StorageError};

fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let payload: String = row.try_get("payload").map_err(ser)?;
    let question: Question = serde_json::from_str(&payload)?;
    if question.id() != id {
        return Err(StorageError::Serialization(format!(
            "question payload id {} does not match row id {id}",
            question.id()
        )));
    }
    Ok(question)
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let payload = serde_json::to_string(question)?;
        sqlx::query(
            r"
                INSERT INTO questions (id, kind, payload)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    payload = excluded.payload
            ",
        )
        .bind(question_id_to_i64(question.id())?)
        .bind(question.question_type().as_str())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_questions(&self, types: &[QuestionType]) -> Result<Vec<Question>, StorageError> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT id, payload FROM questions WHERE kind IN (");
        for i in 0..types.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(") ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        for kind in types {
            query = query.bind(kind.as_str());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_question_row).collect()
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }
}
