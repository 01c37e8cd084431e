use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub method: String,

    pub path: String,

    pub ip: String,

    pub user_agent: Option<String>,

    pub status_code: i32,

    /// Milliseconds
    pub response_time: i64,

    pub user_id: Option<i32>,

    pub username: Option<String>,

    pub admin_id: Option<i32>,

    pub admin_name: Option<String>,

    /// Redacted JSON body preview
    #[sea_orm(column_type = "Text", nullable)]
    pub request_body: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
