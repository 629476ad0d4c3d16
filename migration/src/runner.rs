use std::io::{self, Write};
use std::time::Instant;

use colored::Colorize;
use sea_orm_migration::prelude::*;

const NAME_COLUMN_WIDTH: usize = 56;

/// Applies every migration in registration order, one status line per step.
/// Exits on the first failure so a half-migrated database never gets served.
pub async fn run_all_migrations(url: &str) {
    let db = match sea_orm::Database::connect(url).await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("{} could not open {url}: {err}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    let migrations = <crate::Migrator as MigratorTrait>::migrations();
    println!("Applying {} migrations", migrations.len());

    let manager = SchemaManager::new(&db);
    let started = Instant::now();
    for migration in &migrations {
        apply(&manager, migration.as_ref()).await;
    }
    println!("Schema up to date ({:.2?})", started.elapsed());
}

async fn apply(manager: &SchemaManager<'_>, migration: &dyn MigrationTrait) {
    // Pad from the plain name; ANSI escapes would skew a format width.
    let name = migration.name();
    let dots = ".".repeat(NAME_COLUMN_WIDTH.saturating_sub(name.len()));
    print!("  {}{} ", name.bold(), dots.dimmed());
    let _ = io::stdout().flush();

    let step = Instant::now();
    match migration.up(manager).await {
        Ok(()) => {
            let elapsed = format!("({:.2?})", step.elapsed());
            println!("{} {}", "ok".green(), elapsed.dimmed());
        }
        Err(err) => {
            println!("{}", "failed".red());
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
