use crate::entities::prelude::*;
use crate::entities::{categories, mods};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, PaginatorTrait};

#[derive(DeriveMigrationName)]
pub struct Migration;

const CATEGORIES: [(&str, &str, &str); 5] = [
    ("adventure", "⚔️", "冒险探索"),
    ("technology", "⚡", "科技自动化"),
    ("magic", "✨", "魔法奇幻"),
    ("decoration", "🏠", "建筑装饰"),
    ("utility", "🔧", "实用工具"),
];

struct SeedMod {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
    rating: f64,
    downloads: i64,
    icon: &'static str,
    cloud_link: &'static str,
}

const MODS: [SeedMod; 8] = [
    SeedMod {
        name: "工业时代",
        description: "完善的工业体系，自动化生产线",
        category: "technology",
        tags: &["科技", "自动化"],
        rating: 4.8,
        downloads: 15000,
        icon: "⚡",
        cloud_link: "https://pan.baidu.com/s/example1",
    },
    SeedMod {
        name: "神秘时代",
        description: "探索魔法奥秘，学习强大的法术",
        category: "magic",
        tags: &["魔法", "探索"],
        rating: 5.0,
        downloads: 25000,
        icon: "✨",
        cloud_link: "https://pan.baidu.com/s/example2",
    },
    SeedMod {
        name: "暮色森林",
        description: "全新的维度探索，挑战强大的BOSS",
        category: "adventure",
        tags: &["冒险", "BOSS"],
        rating: 4.9,
        downloads: 30000,
        icon: "🗡️",
        cloud_link: "https://pan.baidu.com/s/example3",
    },
    SeedMod {
        name: "建筑工艺",
        description: "精美的装饰方块，打造完美建筑",
        category: "decoration",
        tags: &["装饰", "建筑"],
        rating: 4.7,
        downloads: 12000,
        icon: "🏠",
        cloud_link: "https://pan.baidu.com/s/example4",
    },
    SeedMod {
        name: "JEI物品管理",
        description: "强大的物品查询和配方查看工具",
        category: "utility",
        tags: &["实用", "工具"],
        rating: 4.9,
        downloads: 50000,
        icon: "🔧",
        cloud_link: "https://pan.baidu.com/s/example5",
    },
    SeedMod {
        name: "应用能源2",
        description: "先进的能源系统，科技与魔法的完美结合",
        category: "technology",
        tags: &["科技", "能源"],
        rating: 4.9,
        downloads: 20000,
        icon: "🔬",
        cloud_link: "https://pan.baidu.com/s/example6",
    },
    SeedMod {
        name: "Aether以太",
        description: "天空维度冒险，探索神秘的空中世界",
        category: "adventure",
        tags: &["冒险", "维度"],
        rating: 4.8,
        downloads: 18000,
        icon: "🏰",
        cloud_link: "https://pan.baidu.com/s/example7",
    },
    SeedMod {
        name: "血魔法",
        description: "以生命为代价的强大魔法，黑暗力量的极致",
        category: "magic",
        tags: &["魔法", "黑暗"],
        rating: 4.7,
        downloads: 22000,
        icon: "🌙",
        cloud_link: "https://pan.baidu.com/s/example8",
    },
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        if Categories::find().count(db).await? == 0 {
            let mut insert = Query::insert();
            insert.into_table(Categories).columns([
                categories::Column::Name,
                categories::Column::Icon,
                categories::Column::Description,
            ]);
            for (name, icon, description) in CATEGORIES {
                insert.values_panic([name.into(), icon.into(), description.into()]);
            }
            manager.exec_stmt(insert.to_owned()).await?;
        }

        if Mods::find().count(db).await? == 0 {
            let now = crate::db::now_timestamp();
            let mut insert = Query::insert();
            insert.into_table(Mods).columns([
                mods::Column::Name,
                mods::Column::Description,
                mods::Column::Category,
                mods::Column::Tags,
                mods::Column::Rating,
                mods::Column::Downloads,
                mods::Column::Icon,
                mods::Column::CloudLink,
                mods::Column::CreatedAt,
            ]);
            for seed in &MODS {
                let tags = serde_json::to_string(seed.tags)
                    .map_err(|e| DbErr::Custom(format!("Failed to encode seed tags: {e}")))?;
                insert.values_panic([
                    seed.name.into(),
                    seed.description.into(),
                    seed.category.into(),
                    tags.into(),
                    seed.rating.into(),
                    seed.downloads.into(),
                    seed.icon.into(),
                    seed.cloud_link.into(),
                    now.clone().into(),
                ]);
            }
            manager.exec_stmt(insert.to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(Mods).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Categories).to_owned())
            .await?;

        Ok(())
    }
}
