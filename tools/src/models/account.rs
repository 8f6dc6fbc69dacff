use diesel::prelude::*;

/// Only the columns the migration tools read. Accounts are created by the
/// web application, never here.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts_account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: i32,
    pub user_id: i32,
    pub old_id: Option<i32>,
}
