use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// UUID v4
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning account. Unique, so an account has at most one member profile.
    #[sea_orm(unique)]
    pub user_id: String,

    #[sea_orm(unique)]
    pub registration_number: String,

    pub department: String,

    pub address: String,

    pub city: String,

    pub country: String,

    pub phone: Option<String>,

    /// Public path of the uploaded avatar, e.g. `/uploads/avatars/<file>`
    pub avatar_url: Option<String>,

    pub bio: Option<String>,

    /// Set by write paths only; never recomputed from the fields above.
    pub is_profile_complete: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
