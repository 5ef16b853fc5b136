use sqlx::postgres::PgConnectOptions;

pub const DEFAULT_PORT: u16 = 5432;

/// Where to find one PostgreSQL database.
///
/// Without a password, sqlx falls back to `PGPASSWORD` and the `.pgpass`
/// file, like libpq does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
}

impl ConnectionSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}
