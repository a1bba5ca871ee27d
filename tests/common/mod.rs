#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use user_upload::{UserRecord, UserStore};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("Duplicate entry '{0}' for key 'users_email_unique'")]
    Duplicate(String),
    #[error("Table 'users' doesn't exist")]
    MissingTable,
    #[error("CREATE command denied to user")]
    Denied,
}

/// Stands in for the users table: unique on email, nothing rolled back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub table: Option<Vec<UserRecord>>,
    pub deny_create: bool,
}

impl MemoryStore {
    pub fn with_table() -> Self {
        Self {
            table: Some(Vec::new()),
            deny_create: false,
        }
    }

    pub fn emails(&self) -> Vec<&str> {
        self.table
            .iter()
            .flatten()
            .map(|u| u.email())
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn create_table(&mut self) -> Result<(), MemoryStoreError> {
        if self.deny_create {
            return Err(MemoryStoreError::Denied);
        }
        self.table.get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), MemoryStoreError> {
        let table = self.table.as_mut().ok_or(MemoryStoreError::MissingTable)?;
        if table.iter().any(|u| u.email() == user.email()) {
            return Err(MemoryStoreError::Duplicate(user.email().to_string()));
        }
        table.push(user.clone());
        Ok(())
    }
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
