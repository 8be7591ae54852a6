use std::fs::{self, File, OpenOptions};
use std::path::Path;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use url::Url;

use crate::entities::{plan, plan_sequence};
use crate::error::AppError;

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Exclusive lock file guarding the database for the duration of a command.
pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    ensure_parent_dir(path)?;
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    connect_with_mode(path, "rwc").await
}

/// Opens an existing database without creating the file.
pub async fn connect_read_only(path: &Path) -> Result<DatabaseConnection, AppError> {
    connect_with_mode(path, "ro").await
}

async fn connect_with_mode(path: &Path, mode: &str) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some(&format!("mode={mode}")));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut plan_stmt = schema.create_table_from_entity(plan::Entity);
    plan_stmt.if_not_exists();
    db.execute(builder.build(&plan_stmt)).await?;

    let mut sequence_stmt = schema.create_table_from_entity(plan_sequence::Entity);
    sequence_stmt.if_not_exists();
    db.execute(builder.build(&sequence_stmt)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn ensure_schema_is_repeatable() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("aopplan.db");
        ensure_parent_dir(&path).expect("parent");
        let db = connect(&path).await.expect("connect");
        ensure_schema(&db).await.expect("first");
        ensure_schema(&db).await.expect("second");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn read_only_connect_does_not_create_the_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("aopplan.db");
        assert!(connect_read_only(&path).await.is_err());
        assert!(!path.exists());

        let db = connect(&path).await.expect("connect");
        ensure_schema(&db).await.expect("schema");
        drop(db);
        connect_read_only(&path).await.expect("read only");
    }
}
