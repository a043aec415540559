use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique, column_type = "String(StringLen::N(255))")]
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    #[sea_orm(default_value = true)]
    pub active: bool,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    pub current_login_at: Option<DateTimeWithTimeZone>,
    pub last_login_ip: Option<String>,
    pub current_login_ip: Option<String>,
    #[sea_orm(default_value = 0)]
    pub login_count: i32,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(has_many)]
    pub roles_users: HasMany<super::roles_users::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
