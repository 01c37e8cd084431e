use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, sea_query::Expr,
};

use crate::entities::{prelude::*, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Row matched by a bearer token lookup.
#[derive(Debug, Clone)]
pub struct TokenHolder<P> {
    pub principal: P,
    pub token_expires: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.is_some())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.is_some())
    }

    /// Get user by username together with the stored password hash
    pub async fn get_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
        created_at: String,
    ) -> Result<User> {
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(User::from(model))
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<TokenHolder<User>>> {
        let user = Users::find()
            .filter(users::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query user by token")?;

        Ok(user.map(|u| TokenHolder {
            token_expires: u.token_expires.clone(),
            principal: User::from(u),
        }))
    }

    pub async fn set_token(&self, id: i32, token: &str, expires: &str) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(users::Column::Token, Expr::value(token))
            .col_expr(users::Column::TokenExpires, Expr::value(expires))
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn clear_token(&self, id: i32) -> Result<()> {
        clear_tokens(&self.conn, users::Column::Id.eq(id)).await?;
        Ok(())
    }

    /// Clears the token only while it is still the one that was looked up,
    /// so a concurrent fresh login is left alone.
    pub async fn clear_token_if_current(&self, id: i32, token: &str) -> Result<()> {
        clear_tokens(
            &self.conn,
            users::Column::Id
                .eq(id)
                .and(users::Column::Token.eq(token)),
        )
        .await?;
        Ok(())
    }

    pub async fn clear_expired_tokens(&self, now: &str) -> Result<u64> {
        clear_tokens(&self.conn, users::Column::TokenExpires.lt(now)).await
    }
}

async fn clear_tokens<C, F>(db: &C, filter: F) -> Result<u64>
where
    C: ConnectionTrait,
    F: sea_orm::sea_query::IntoCondition,
{
    let result = Users::update_many()
        .col_expr(users::Column::Token, Expr::value(Option::<String>::None))
        .col_expr(users::Column::TokenExpires, Expr::value(Option::<String>::None))
        .filter(filter)
        .exec(db)
        .await
        .context("Failed to clear user tokens")?;

    Ok(result.rows_affected)
}
