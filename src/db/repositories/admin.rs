use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, sea_query::Expr,
};

use super::user::TokenHolder;
use crate::entities::{admins, prelude::*};

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub created_at: String,
}

impl From<admins::Model> for Admin {
    fn from(model: admins::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            created_at: model.created_at,
        }
    }
}

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn count(&self) -> Result<u64> {
        Admins::find()
            .count(&self.conn)
            .await
            .context("Failed to count admins")
    }

    pub async fn get_with_password(&self, username: &str) -> Result<Option<(Admin, String)>> {
        let admin = Admins::find()
            .filter(admins::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin by username")?;

        Ok(admin.map(|a| {
            let password_hash = a.password_hash.clone();
            (Admin::from(a), password_hash)
        }))
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: String,
        created_at: String,
    ) -> Result<Admin> {
        let model = admins::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Admin::from(model))
    }

    /// Replaces the password hash and signs the admin out.
    pub async fn reset_password(&self, username: &str, password_hash: String) -> Result<bool> {
        let result = Admins::update_many()
            .col_expr(admins::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(admins::Column::Token, Expr::value(Option::<String>::None))
            .col_expr(admins::Column::TokenExpires, Expr::value(Option::<String>::None))
            .filter(admins::Column::Username.eq(username))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<TokenHolder<Admin>>> {
        let admin = Admins::find()
            .filter(admins::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query admin by token")?;

        Ok(admin.map(|a| TokenHolder {
            token_expires: a.token_expires.clone(),
            principal: Admin::from(a),
        }))
    }

    pub async fn set_token(&self, id: i32, token: &str, expires: &str) -> Result<bool> {
        let result = Admins::update_many()
            .col_expr(admins::Column::Token, Expr::value(token))
            .col_expr(admins::Column::TokenExpires, Expr::value(expires))
            .filter(admins::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn clear_token(&self, id: i32) -> Result<()> {
        self.clear_where(admins::Column::Id.eq(id)).await?;
        Ok(())
    }

    pub async fn clear_token_if_current(&self, id: i32, token: &str) -> Result<()> {
        self.clear_where(
            admins::Column::Id
                .eq(id)
                .and(admins::Column::Token.eq(token)),
        )
        .await?;
        Ok(())
    }

    pub async fn clear_expired_tokens(&self, now: &str) -> Result<u64> {
        self.clear_where(admins::Column::TokenExpires.lt(now)).await
    }

    async fn clear_where(&self, filter: sea_orm::sea_query::SimpleExpr) -> Result<u64> {
        let result = Admins::update_many()
            .col_expr(admins::Column::Token, Expr::value(Option::<String>::None))
            .col_expr(admins::Column::TokenExpires, Expr::value(Option::<String>::None))
            .filter(filter)
            .exec(&self.conn)
            .await
            .context("Failed to clear admin tokens")?;

        Ok(result.rows_affected)
    }
}
