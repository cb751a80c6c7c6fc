//! SQLite-backed EEPROM image.
//!
//! One row per written cell. Cells without a row read as erased.

use std::str::FromStr;

use openscale_store::eeprom::ERASED;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // single writer, and keeps `sqlite::memory:` on one database
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

pub async fn migrate(db: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS eeprom (
            address INTEGER PRIMARY KEY,
            value INTEGER NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    Ok(())
}

/// Reads the stored image into a buffer of `capacity` erased cells.
pub async fn load_image(db: &SqlitePool, capacity: usize) -> Result<Vec<u8>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64)>("SELECT address, value FROM eeprom")
        .fetch_all(db)
        .await?;

    let mut image = vec![ERASED; capacity];
    for (address, value) in rows {
        match usize::try_from(address) {
            Ok(address) if address < capacity => image[address] = value as u8,
            _ => tracing::warn!("Ignoring EEPROM cell outside the medium: {}", address),
        }
    }

    Ok(image)
}

/// Stores `image` starting at address 0 in one transaction.
pub async fn save_image(db: &SqlitePool, image: &[u8]) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;

    for (address, value) in image.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO eeprom (address, value) VALUES (?, ?)
            ON CONFLICT(address) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(address as i64)
        .bind(i64::from(*value))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!("Saved {} EEPROM bytes", image.len());

    Ok(())
}
