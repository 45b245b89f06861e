use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Un rapport actif par stage (convention_id UNIQUE), re-soumission = écrasement
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rapports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub convention_id: i32,
    pub titre: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub fichier_url: String,
    pub submitted_at: DateTimeUtc,
    pub note: Option<Decimal>, // 0-20, présente => rapport évalué
    #[sea_orm(column_type = "Text", nullable)]
    pub commentaire: Option<String>,
    pub graded_at: Option<DateTimeUtc>,
    pub graded_by: Option<i32>,
}

impl Model {
    pub fn is_graded(&self) -> bool {
        self.note.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::convention::Entity",
        from = "Column::ConventionId",
        to = "super::convention::Column::Id",
        on_delete = "Cascade"
    )]
    Convention,
}

impl Related<super::convention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Convention.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
