use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::StoreError;
use crate::people::repo_types::{Person, PersonFields};

#[async_trait]
pub trait PersonRepo: Send + Sync {
    /// Reserves an id for a person that has not been inserted yet.
    ///
    /// Image files are placed under the id's directory before the row exists,
    /// so the row and its image paths can be written in one transaction.
    async fn reserve_id(&self) -> Result<i64, StoreError>;
    /// Inserts the person under a reserved id together with its image paths.
    async fn insert(
        &self,
        id: i64,
        fields: &PersonFields,
        image_paths: &[String],
    ) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<Person>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Person>, StoreError>;
    /// Overwrites every scalar column; false when the person does not exist.
    async fn update(&self, id: i64, fields: &PersonFields) -> Result<bool, StoreError>;
    /// Full replace of the image rows of one person.
    async fn replace_images(&self, id: i64, paths: &[String]) -> Result<(), StoreError>;
    /// `update` and `replace_images` in one transaction.
    async fn update_with_images(
        &self,
        id: i64,
        fields: &PersonFields,
        paths: &[String],
    ) -> Result<bool, StoreError>;
    /// Deletes the person and all of its image rows.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgPersonRepo {
    db: PgPool,
}

impl PgPersonRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_images_tx(
    tx: &mut Transaction<'_, Postgres>,
    person_id: i64,
    paths: &[String],
) -> Result<(), StoreError> {
    for path in paths {
        sqlx::query("INSERT INTO people_images (person_id, path) VALUES ($1, $2)")
            .bind(person_id)
            .bind(path)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn replace_images_tx(
    tx: &mut Transaction<'_, Postgres>,
    person_id: i64,
    paths: &[String],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM people_images WHERE person_id = $1")
        .bind(person_id)
        .execute(&mut **tx)
        .await?;
    insert_images_tx(tx, person_id, paths).await
}

async fn update_fields_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    fields: &PersonFields,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE people
           SET name = $2, address = $3, phone = $4, email = $5, ip_address = $6,
               label = $7, description = $8, convicted = $9, socials = $10
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(fields.address.as_deref())
    .bind(fields.phone.as_deref())
    .bind(fields.email.as_deref())
    .bind(fields.ip_address.as_deref())
    .bind(fields.label.as_deref())
    .bind(&fields.description)
    .bind(fields.convicted)
    .bind(fields.socials.as_deref())
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn images_of(db: &PgPool, person_id: i64) -> Result<Vec<String>, StoreError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT path FROM people_images WHERE person_id = $1 ORDER BY id")
            .bind(person_id)
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

#[async_trait]
impl PersonRepo for PgPersonRepo {
    async fn reserve_id(&self) -> Result<i64, StoreError> {
        let (id,): (i64,) =
            sqlx::query_as("SELECT nextval(pg_get_serial_sequence('people', 'id'))")
                .fetch_one(&self.db)
                .await?;
        Ok(id)
    }

    async fn insert(
        &self,
        id: i64,
        fields: &PersonFields,
        image_paths: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO people
                (id, name, address, phone, email, ip_address, label, description, convicted, socials)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(fields.address.as_deref())
        .bind(fields.phone.as_deref())
        .bind(fields.email.as_deref())
        .bind(fields.ip_address.as_deref())
        .bind(fields.label.as_deref())
        .bind(&fields.description)
        .bind(fields.convicted)
        .bind(fields.socials.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::on_write(e, "person"))?;
        insert_images_tx(&mut tx, id, image_paths).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Person>, StoreError> {
        let mut people = sqlx::query_as::<_, Person>(
            r#"
            SELECT id, name, address, phone, email, ip_address, label, description, convicted, socials
            FROM people
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT person_id, path FROM people_images ORDER BY id")
                .fetch_all(&self.db)
                .await?;
        let mut by_person: HashMap<i64, Vec<String>> = HashMap::new();
        for (person_id, path) in rows {
            by_person.entry(person_id).or_default().push(path);
        }
        for p in &mut people {
            p.images = by_person.remove(&p.id).unwrap_or_default();
        }
        Ok(people)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Person>, StoreError> {
        let person = sqlx::query_as::<_, Person>(
            r#"
            SELECT id, name, address, phone, email, ip_address, label, description, convicted, socials
            FROM people
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match person {
            Some(mut p) => {
                p.images = images_of(&self.db, id).await?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: i64, fields: &PersonFields) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;
        let found = update_fields_tx(&mut tx, id, fields).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn replace_images(&self, id: i64, paths: &[String]) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        replace_images_tx(&mut tx, id, paths).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_with_images(
        &self,
        id: i64,
        fields: &PersonFields,
        paths: &[String],
    ) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;
        if !update_fields_tx(&mut tx, id, fields).await? {
            return Ok(false);
        }
        replace_images_tx(&mut tx, id, paths).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        // image rows go first in the same transaction; the FK also cascades
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM people_images WHERE person_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM people WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> PersonFields {
        PersonFields {
            name: name.into(),
            description: "desc".into(),
            ..Default::default()
        }
    }

    fn paths(id: i64, names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("person_{id}/{n}")).collect()
    }

    async fn image_rows(db: &PgPool, person_id: i64) -> i64 {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM people_images WHERE person_id = $1")
                .bind(person_id)
                .fetch_one(db)
                .await
                .unwrap();
        n
    }

    async fn seeded(repo: &PgPersonRepo, name: &str, images: &[&str]) -> i64 {
        let id = repo.reserve_id().await.unwrap();
        repo.insert(id, &fields(name), &paths(id, images)).await.unwrap();
        id
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn insert_stores_record_with_images(db: PgPool) {
        let repo = PgPersonRepo::new(db);
        let id = seeded(&repo, "Ann", &["a.png", "b.png"]).await;

        let person = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(person.name, "Ann");
        assert_eq!(person.images, paths(id, &["a.png", "b.png"]));

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].images, person.images);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn delete_removes_record_and_images(db: PgPool) {
        let repo = PgPersonRepo::new(db.clone());
        let id = seeded(&repo, "Ann", &["a.png", "b.png"]).await;
        let other = seeded(&repo, "Bob", &["c.png"]).await;

        assert!(repo.delete(id).await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert_eq!(image_rows(&db, id).await, 0);
        assert_eq!(image_rows(&db, other).await, 1);
        assert!(!repo.delete(id).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn schema_cascades_image_rows(db: PgPool) {
        let repo = PgPersonRepo::new(db.clone());
        let id = seeded(&repo, "Ann", &["a.png"]).await;

        sqlx::query("DELETE FROM people WHERE id = $1")
            .bind(id)
            .execute(&db)
            .await
            .unwrap();
        assert_eq!(image_rows(&db, id).await, 0);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn replace_images_is_a_full_replace(db: PgPool) {
        let repo = PgPersonRepo::new(db);
        let id = seeded(&repo, "Ann", &["a.png", "b.png"]).await;

        repo.replace_images(id, &paths(id, &["c.png"])).await.unwrap();
        let person = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(person.images, paths(id, &["c.png"]));

        repo.replace_images(id, &[]).await.unwrap();
        let person = repo.find_by_id(id).await.unwrap().unwrap();
        assert!(person.images.is_empty());
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn failed_image_write_rolls_back_field_update(db: PgPool) {
        let repo = PgPersonRepo::new(db);
        let id = seeded(&repo, "Old", &["a.png"]).await;
        // longer than the path column allows
        let too_long = vec![format!("person_{id}/{}.png", "x".repeat(600))];

        assert!(repo
            .update_with_images(id, &fields("New"), &too_long)
            .await
            .is_err());
        let person = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(person.name, "Old");
        assert_eq!(person.images, paths(id, &["a.png"]));

        assert!(repo
            .update_with_images(id, &fields("New"), &paths(id, &["b.png"]))
            .await
            .unwrap());
        let person = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(person.name, "New");
        assert_eq!(person.images, paths(id, &["b.png"]));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn update_of_missing_record_reports_false(db: PgPool) {
        let repo = PgPersonRepo::new(db);
        assert!(!repo.update(424242, &fields("x")).await.unwrap());
        assert!(!repo
            .update_with_images(424242, &fields("x"), &[])
            .await
            .unwrap());
    }
}
