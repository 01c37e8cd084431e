use crate::entities::prelude::*;
use crate::entities::{admins, api_logs, mods, ratings, users};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Second line of defence behind the already-rated check.
        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_mod_user")
                    .table(Ratings)
                    .col(ratings::Column::ModId)
                    .col(ratings::Column::UserId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_token")
                    .table(Users)
                    .col(users::Column::Token)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_admins_token")
                    .table(Admins)
                    .col(admins::Column::Token)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mods_category")
                    .table(Mods)
                    .col(mods::Column::Category)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let log_indexes: [(&str, Vec<api_logs::Column>); 7] = [
            ("idx_api_logs_created_at", vec![api_logs::Column::CreatedAt]),
            (
                "idx_api_logs_method_created",
                vec![api_logs::Column::Method, api_logs::Column::CreatedAt],
            ),
            (
                "idx_api_logs_status_created",
                vec![api_logs::Column::StatusCode, api_logs::Column::CreatedAt],
            ),
            (
                "idx_api_logs_user_created",
                vec![api_logs::Column::UserId, api_logs::Column::CreatedAt],
            ),
            (
                "idx_api_logs_admin_created",
                vec![api_logs::Column::AdminId, api_logs::Column::CreatedAt],
            ),
            (
                "idx_api_logs_ip_created",
                vec![api_logs::Column::Ip, api_logs::Column::CreatedAt],
            ),
            ("idx_api_logs_path", vec![api_logs::Column::Path]),
        ];

        for (name, columns) in log_indexes {
            let mut index = Index::create();
            index.name(name).table(ApiLogs).if_not_exists();
            for column in columns {
                index.col(column);
            }
            manager.create_index(index.to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("idx_ratings_mod_user", "ratings"),
            ("idx_users_token", "users"),
            ("idx_admins_token", "admins"),
            ("idx_mods_category", "mods"),
            ("idx_api_logs_created_at", "api_logs"),
            ("idx_api_logs_method_created", "api_logs"),
            ("idx_api_logs_status_created", "api_logs"),
            ("idx_api_logs_user_created", "api_logs"),
            ("idx_api_logs_admin_created", "api_logs"),
            ("idx_api_logs_ip_created", "api_logs"),
            ("idx_api_logs_path", "api_logs"),
        ] {
            manager
                .drop_index(Index::drop().name(name).table(Alias::new(table)).to_owned())
                .await?;
        }

        Ok(())
    }
}
