use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

pub(crate) async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            vitrine_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = vitrine_db::run_migrations(pool).await?;
            tracing::info!(applied, "migrations applied");
            println!("applied {applied} new migration(s)");
        }
    }
    Ok(())
}
