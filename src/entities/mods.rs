use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "mods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Name of the owning category.
    pub category: String,

    /// JSON array of strings, e.g. `["tech","automation"]`.
    #[sea_orm(column_type = "Text")]
    pub tags: String,

    /// Mean of all ratings rounded to one decimal.
    pub rating: f64,

    pub downloads: i64,

    pub icon: String,

    pub cloud_link: String,

    pub source_link: Option<String>,

    pub background_image: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ratings::Entity")]
    Ratings,
}

impl Related<super::ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
