use cats_social::db::{self, DatabaseConfig, get_db_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&config).await?;

    db::migrations::run_migrations(&pool).await?;
    println!("Migrations completed successfully");

    Ok(())
}
