//! Users table (minimal entity).
//!
//! Projects store their owner by `owner_id`, which is the username. Passwords
//! are kept as a SHA-256 digest of `username:password`.

use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, entity::prelude::*};
use sha2::{Digest, Sha256};

use crate::{EngineError, ResultEngine, ops::Engine, ops::with_tx, util::normalize_required_name};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Hex digest stored in `users.password_hash`.
pub fn password_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl Engine {
    /// Register a new user.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = normalize_required_name(username, "username")?;
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            if Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }

            let user = ActiveModel {
                username: ActiveValue::Set(username.clone()),
                password_hash: ActiveValue::Set(password_digest(&username, password)),
                created_at: ActiveValue::Set(Utc::now()),
            };
            user.insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns the username when the credentials match a stored user.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> ResultEngine<Option<String>> {
        let Some(user) = Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };

        if user.password_hash != password_digest(username, password) {
            return Ok(None);
        }
        Ok(Some(user.username))
    }

    pub async fn user_exists(&self, username: &str) -> ResultEngine<bool> {
        Ok(Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_username() {
        let a = password_digest("alice", "secret");
        let b = password_digest("bob", "secret");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, password_digest("alice", "secret"));
    }
}
