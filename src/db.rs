//! MySQL side: opening the single connection, the users table, and inserts.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tracing::{info, warn};

use crate::config::DbSettings;
use crate::normalize::UserRecord;
use crate::UploadResult;

/// Database every run connects to.
pub const DATABASE_NAME: &str = "user_upload";

pub const USERS_TABLE: &str = "users";

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INT UNSIGNED NOT NULL AUTO_INCREMENT,
    name VARCHAR(255) NOT NULL,
    surname VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    PRIMARY KEY (id),
    UNIQUE KEY users_email_unique (email)
) DEFAULT CHARSET = utf8mb4
"#;

const INSERT_USER: &str = "INSERT INTO users (name, surname, email) VALUES (?, ?, ?)";

/// Where accepted users end up.
#[async_trait]
pub trait UserStore: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create the users table if it isn't there. Never drops anything.
    async fn create_table(&mut self) -> Result<(), Self::Error>;

    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), Self::Error>;
}

#[async_trait]
impl UserStore for MySqlConnection {
    type Error = sqlx::Error;

    async fn create_table(&mut self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_USERS_TABLE).execute(&mut *self).await?;
        Ok(())
    }

    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), sqlx::Error> {
        sqlx::query(INSERT_USER)
            .bind(user.name())
            .bind(user.surname())
            .bind(user.email())
            .execute(&mut *self)
            .await?;
        Ok(())
    }
}

/// One connection attempt, no retry.
pub async fn connect(settings: &DbSettings) -> UploadResult<MySqlConnection> {
    let options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .database(DATABASE_NAME);

    let conn = MySqlConnection::connect_with(&options).await?;
    info!(
        host = %settings.host,
        port = settings.port,
        database = DATABASE_NAME,
        "connected"
    );
    Ok(conn)
}

/// Close the connection. A failure here has nothing left to undo, so it is only logged.
pub async fn release(conn: MySqlConnection) {
    if let Err(err) = conn.close().await {
        warn!(error = %err, "error while closing connection");
    }
}

/// Ensure the users table exists.
pub async fn create_table<S>(store: &mut S) -> Result<(), S::Error>
where
    S: UserStore + ?Sized,
{
    store.create_table().await?;
    info!(table = USERS_TABLE, "users table ready");
    Ok(())
}
