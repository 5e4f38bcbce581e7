use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use capstone_tracker::db::projects::{create_with_owner, NewProject};
use capstone_tracker::db::rollback_last;
use capstone_tracker::models::member::MemberRole;
use capstone_tracker::models::task::{TaskPriority, TaskStatus};
use capstone_tracker::models::user::{UserRole, PROVIDER_CREDENTIALS};
use capstone_tracker::utils::hash_password;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const SEED_PASSWORD: &str = "password123";
const SEED_INSTRUCTOR: &str = "instructor@capstone.edu";

#[derive(Parser, Debug)]
#[command(author, version, about = "capstone tracker database tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Revert the most recently applied migration
    MigrateRollback,
    /// Insert demo users and a sample project (skipped if already seeded)
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {} (and its .down.sql)", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            match rollback_last(&pool, &migrator).await? {
                Some(version) => println!("Rolled back migration {version}"),
                None => println!("No applied migrations to roll back"),
            }
        }
        Commands::Seed => {
            let pool = get_pool().await?;
            get_migrator().await?.run(&pool).await?;
            seed(&pool).await?;
        }
    }

    Ok(())
}

/// Creates an `.up.sql`/`.down.sql` pair and returns the path of the up script.
fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let stem = format!("{}_{}", timestamp, sanitize_name(name));
    let up = Path::new("migrations").join(format!("{stem}.up.sql"));
    let down = Path::new("migrations").join(format!("{stem}.down.sql"));

    for path in [&up, &down] {
        if path.exists() {
            anyhow::bail!("migration already exists: {}", path.display());
        }
    }

    fs::write(&up, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", up.display()))?;
    fs::write(&down, "-- Revert the matching up migration here\n")
        .with_context(|| format!("failed to create migration at {}", down.display()))?;

    Ok(up)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter().filter(|m| !m.migration_type.is_down_migration()) {
        let version = migration.version;
        let applied = applied_versions.contains(&version);
        let status = if applied { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Try local ./migrations first (when running from repo root). If that
    // doesn't exist (common in containers where CWD differs), fall back to
    // the crate-local migrations folder determined by CARGO_MANIFEST_DIR.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}

async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let seeded: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(SEED_INSTRUCTOR)
        .fetch_one(pool)
        .await?;
    if seeded > 0 {
        println!("Demo data already present, nothing to do");
        return Ok(());
    }

    let password_hash = hash_password(SEED_PASSWORD)?;
    insert_user(pool, SEED_INSTRUCTOR, "Grace", "Hopper", UserRole::Instructor, &password_hash).await?;
    let alice = insert_user(pool, "alice@student.edu", "Alice", "Nguyen", UserRole::Student, &password_hash).await?;
    let bob = insert_user(pool, "bob@student.edu", "Bob", "Okafor", UserRole::Student, &password_hash).await?;
    let carol = insert_user(pool, "carol@student.edu", "Carol", "Silva", UserRole::Student, &password_hash).await?;

    let start = Utc::now();
    let project = create_with_owner(
        pool,
        alice,
        NewProject {
            name: "E-Commerce Platform",
            description: Some("Full-stack shop with cart, checkout and order tracking."),
            start_date: Some(start),
            end_date: Some(start + Duration::weeks(14)),
        },
    )
    .await?;

    for member in [bob, carol] {
        sqlx::query("INSERT INTO team_members (id, project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind(project.id)
            .bind(member)
            .bind(MemberRole::Member.as_str())
            .bind(Utc::now())
            .execute(pool)
            .await?;
    }

    let foundation = insert_milestone(pool, project.id, "Phase 1: Foundation", start + Duration::weeks(4)).await?;
    let features = insert_milestone(pool, project.id, "Phase 2: Core Features", start + Duration::weeks(10)).await?;

    let tasks = [
        ("Set up repository and CI", foundation, Some(alice), TaskStatus::Done, TaskPriority::High),
        ("Design database schema", foundation, Some(bob), TaskStatus::InProgress, TaskPriority::High),
        ("Implement authentication", foundation, Some(carol), TaskStatus::Todo, TaskPriority::Urgent),
        ("Product catalogue pages", features, None, TaskStatus::Todo, TaskPriority::Medium),
        ("Checkout flow", features, None, TaskStatus::Todo, TaskPriority::Low),
    ];
    for (title, milestone_id, assignee, status, priority) in tasks {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tasks (id, project_id, milestone_id, title, description, status, priority, assignee_id, creator_id, due_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(project.id)
        .bind(milestone_id)
        .bind(title)
        .bind(status.as_str())
        .bind(priority.as_str())
        .bind(assignee)
        .bind(alice)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }

    println!("Seeded demo data (password for every account: {SEED_PASSWORD})");
    Ok(())
}

async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: UserRole,
    password_hash: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, email, first_name, last_name, role, password_hash, provider, image, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(role.as_str())
    .bind(password_hash)
    .bind(PROVIDER_CREDENTIALS)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert {email}"))?;

    Ok(id)
}

async fn insert_milestone(
    pool: &SqlitePool,
    project_id: Uuid,
    name: &str,
    due_date: chrono::DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO milestones (id, project_id, name, description, due_date, is_completed, created_at, updated_at) \
         VALUES (?, ?, ?, NULL, ?, 0, ?, ?)",
    )
    .bind(id)
    .bind(project_id)
    .bind(name)
    .bind(due_date)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}
