use sea_orm_migration::prelude::*;

mod m20250301_initial;
mod m20250302_add_indexes;
mod m20250303_seed_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_initial::Migration),
            Box::new(m20250302_add_indexes::Migration),
            Box::new(m20250303_seed_catalog::Migration),
        ]
    }
}
