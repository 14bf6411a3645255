use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use bubble_migrate::config::{Mode, Settings, Target};
use bubble_migrate::migrator;
use bubble_migrate::seed_sql;
use bubble_migrate::source::SourceReader;
use bubble_migrate::verify;

#[derive(Parser, Debug)]
#[command(
    name = "bubble-migrate",
    about = "Migrate Bubble CSV exports into the relational schema"
)]
struct Args {
    /// Write through a direct Postgres connection (DATABASE_URL) instead of the hosted API.
    #[arg(long)]
    direct: bool,

    /// Only write offline INSERT statements for users; nothing is connected to.
    #[arg(long, conflicts_with_all = ["direct", "verify"])]
    sql_only: bool,

    /// Print row counts of every target table (direct connection) and exit.
    #[arg(long)]
    verify: bool,

    /// Directory holding the CSV exports (overrides BUBBLE_EXPORT_DIR).
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Records per insert batch (overrides MIGRATE_BATCH_SIZE).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,

    /// Output file for --sql-only.
    #[arg(long, default_value = "seed_data.sql")]
    output: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = args.export_dir {
        settings.export_dir = dir;
    }
    if let Some(size) = args.batch_size {
        settings.batch_size = usize::try_from(size)?;
    }

    if args.sql_only {
        let reader = SourceReader::new(settings.export_dir.clone());
        let count = seed_sql::generate_seed_file(&reader, &args.output)?;
        println!("{} user statements written to {}", count, args.output.display());
        return Ok(());
    }

    if args.verify {
        let target = Target::from_env(Mode::Direct)?;
        if let Some(database_url) = target.database_url() {
            let counts = verify::verify_target(database_url).await?;
            print!("{}", verify::format_row_counts(&counts));
        }
        return Ok(());
    }

    let mode = if args.direct { Mode::Direct } else { Mode::Hosted };
    let target = Target::from_env(mode)?;
    log::info!("starting migration ({:?})", target);

    let stats = migrator::run(&target, &settings).await?;
    print!("{}", stats);
    Ok(())
}
