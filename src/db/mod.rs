use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::migrate::{Migrate, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub mod projects;

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

	let options = SqliteConnectOptions::from_str(&database_url)
		.context("invalid DATABASE_URL")?
		.create_if_missing(true)
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect_with(options)
		.await
		.context("failed to connect to database")?;

	sqlx::migrate!()
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	Ok(pool)
}

/// Reverts the most recently applied migration and returns its version.
/// `Ok(None)` means nothing was applied.
pub async fn rollback_last(pool: &SqlitePool, migrator: &Migrator) -> anyhow::Result<Option<i64>> {
	let mut applied: Vec<i64> = {
		let mut conn = pool.acquire().await?;
		conn.ensure_migrations_table().await?;
		conn.list_applied_migrations()
			.await?
			.into_iter()
			.map(|migration| migration.version)
			.collect()
	};
	applied.sort_unstable();

	let Some(last) = applied.pop() else {
		return Ok(None);
	};
	// `undo` reverts everything above the target, so aim at the previous applied version.
	let target = applied.last().copied().unwrap_or(0);

	let reversible = migrator
		.iter()
		.any(|migration| migration.version == last && migration.migration_type.is_down_migration());
	if !reversible {
		anyhow::bail!("migration {last} has no down script");
	}

	migrator
		.undo(pool, target)
		.await
		.with_context(|| format!("failed to roll back migration {last}"))?;

	tracing::info!(version = last, "migration rolled back");
	Ok(Some(last))
}
