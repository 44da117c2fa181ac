//! # seed
//!
//! Provisions an administrator and a starting set of categories, and can
//! print a bearer token for the administrator for local development.

use anyhow::{bail, Context};
use auth_adapters::JwtSessionVerifier;
use clap::Parser;
use configs::AppConfig;
use domains::{CategoryRepository, NewCategory, NewUser, Session, UserRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_TOKEN_HOURS: i64 = 24 * 366;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Provision an admin account and categories")]
struct Args {
    /// Username of the administrator to ensure.
    #[arg(long, default_value = "admin")]
    admin: String,

    /// Category to ensure; repeatable.
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Print a bearer token for the administrator, valid for this many hours.
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_HOURS))]
    token_hours: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::load().context("loading configuration")?;
    if config.database.is_memory() {
        bail!("seeding needs a persistent database; set FORUM__DATABASE__URL");
    }
    let store = open_store(&config).await?;

    let admin = match store.find_by_username(&args.admin).await? {
        Some(user) => {
            info!(user_id = user.id, "admin already present");
            user
        }
        None => {
            let user = UserRepository::create(
                &store,
                NewUser { username: args.admin.clone(), color: config.forum.default_category_color.clone(), admin: true },
            )
            .await?;
            info!(user_id = user.id, "admin created");
            user
        }
    };

    for name in &args.categories {
        if store.find_by_key(name).await?.is_some() {
            info!(%name, "category already present");
            continue;
        }
        let category = CategoryRepository::create(
            &store,
            NewCategory { name: name.clone(), color: config.forum.default_category_color.clone() },
        )
        .await?;
        info!(category_id = category.id, value = %category.value, "category created");
    }

    if let Some(hours) = args.token_hours {
        let verifier = JwtSessionVerifier::new(&config.auth.jwt_secret);
        let session = Session { user_id: admin.id, username: admin.username.clone(), admin: true };
        let lifetime = chrono::TimeDelta::try_hours(hours).context("--token-hours is out of range")?;
        println!("{}", verifier.issue(&session, lifetime)?);
    }

    Ok(())
}

#[cfg(feature = "db-postgres")]
async fn open_store(config: &AppConfig) -> anyhow::Result<storage_adapters::PgStore> {
    let store = storage_adapters::PgStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to postgres")?;
    store.migrate().await?;
    Ok(store)
}

#[cfg(not(feature = "db-postgres"))]
async fn open_store(config: &AppConfig) -> anyhow::Result<storage_adapters::MemoryStore> {
    bail!("database url {} needs the db-postgres feature", config.database.url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hours_must_fit_a_year() {
        let args = Args::try_parse_from(["seed", "--token-hours", "12"]).unwrap();
        assert_eq!(args.token_hours, Some(12));

        for hours in ["0", "-3", "9223372036854775807"] {
            assert!(Args::try_parse_from(["seed", "--token-hours", hours]).is_err(), "{hours}");
        }
    }
}
