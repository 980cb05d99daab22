use super::{Action, Gate, Scope};

/// The standard actions. View actions and `execute-sql` are allowed unless a
/// rule says otherwise; everything that changes data is denied.
pub fn actions() -> Vec<Action> {
    vec![
        Action::new("view-instance", Scope::Instance, true)
            .abbr("vi")
            .description("View the instance")
            .gate(Gate::Allow),
        Action::new("permissions-debug", Scope::Instance, false)
            .abbr("pd")
            .description("Access the permission audit log"),
        Action::new("debug-menu", Scope::Instance, false)
            .abbr("dm")
            .description("View debug menu items"),
        Action::new("view-database", Scope::Database, true)
            .abbr("vd")
            .description("View database")
            .gate(Gate::Allow),
        Action::new("view-database-download", Scope::Database, true)
            .abbr("vdd")
            .description("Download database file"),
        Action::new("execute-sql", Scope::Database, true)
            .abbr("es")
            .description("Execute read-only SQL queries")
            .gate(Gate::AllowSql),
        Action::new("create-table", Scope::Database, false)
            .abbr("ct")
            .description("Create tables"),
        Action::new("view-table", Scope::Table, true)
            .abbr("vt")
            .description("View table")
            .gate(Gate::Allow),
        Action::new("insert-row", Scope::Table, false)
            .abbr("ir")
            .description("Insert rows"),
        Action::new("delete-row", Scope::Table, false)
            .abbr("dr")
            .description("Delete rows"),
        Action::new("update-row", Scope::Table, false)
            .abbr("ur")
            .description("Update rows"),
        Action::new("alter-table", Scope::Table, false)
            .abbr("at")
            .description("Alter tables"),
        Action::new("drop-table", Scope::Table, false)
            .abbr("dt")
            .description("Drop tables"),
        Action::new("view-query", Scope::Query, true)
            .abbr("vq")
            .description("View named query results")
            .gate(Gate::Allow),
    ]
}

pub const EXECUTE_SQL: &str = "execute-sql";
pub const PERMISSIONS_DEBUG: &str = "permissions-debug";
