use clap::{Parser, Subcommand};
use fractic_server_error::ServerError;
use movies_dynamo::{
    ext::{partiql::PartiqlRunner, sample_data::sample_movies},
    schema::movie::{INFO_PLOT, INFO_RATING},
    DynamoConfig, DynamoUtil, InfoValue, Movie, MovieKey,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Demo client for the movies table.
///
/// Connection settings come from the environment (DYNAMO_REGION,
/// DYNAMO_ENDPOINT, DYNAMO_ACCESS_KEY_ID, DYNAMO_SECRET_ACCESS_KEY,
/// DYNAMO_TABLE), optionally through a .env file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one movie by key.
    Get {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i64,
    },
    /// Print every movie in the table.
    Scan,
    /// Print movies released in the given (inclusive) year range.
    ScanYears {
        #[arg(long)]
        start: i64,
        #[arg(long)]
        end: i64,
    },
    /// Print movies released in the given year.
    Query {
        #[arg(long)]
        year: i64,
    },
    /// Batch-write the built-in sample movies.
    Seed {
        /// Max number of movies to write.
        #[arg(long)]
        max: Option<usize>,
    },
    /// Create the table and wait until it is active.
    CreateTable,
    /// Delete the table.
    DeleteTable,
    /// List the tables visible to the connection.
    ListTables,
    /// Insert a movie with a PartiQL statement.
    Insert {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i64,
        #[arg(long)]
        rating: f64,
        #[arg(long)]
        plot: String,
    },
    /// Set a movie's rating with a PartiQL statement.
    UpdateRating {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i64,
        #[arg(long)]
        rating: f64,
    },
    /// Delete a movie with a PartiQL statement.
    Delete {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i64,
    },
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn print_movies(movies: &[Movie]) {
    for movie in movies {
        println!("{movie}");
    }
}

async fn run(command: Option<Command>) -> Result<(), ServerError> {
    let config = DynamoConfig::from_env()?;
    let util = DynamoUtil::new(&config).await?;
    let runner = PartiqlRunner::from(&util);

    match command {
        None => {
            let key = MovieKey::new(2023, "Super Mario Bros")?;
            match runner.get_movie(&key).await? {
                Some(movie) => println!("{movie}"),
                None => tracing::warn!(key = %key, "movie not found"),
            }
        }
        Some(Command::Get { title, year }) => {
            let key = MovieKey::new(year, title)?;
            match util.get_movie(&key).await? {
                Some(movie) => println!("{movie}"),
                None => tracing::warn!(key = %key, "movie not found"),
            }
        }
        Some(Command::Scan) => print_movies(&util.scan().await?),
        Some(Command::ScanYears { start, end }) => {
            print_movies(&util.scan_by_year(start, end).await?)
        }
        Some(Command::Query { year }) => print_movies(&util.query_by_year(year).await?),
        Some(Command::Seed { max }) => {
            let movies = sample_movies();
            let report = util
                .batch_put_movies(&movies, max.unwrap_or(movies.len()))
                .await?;
            println!("Records written: {}", report.written);
            for movie in &report.unprocessed {
                println!("Not written: {}|{}", movie.year, movie.title);
            }
        }
        Some(Command::CreateTable) => util.create_table().await?,
        Some(Command::DeleteTable) => util.delete_table().await?,
        Some(Command::ListTables) => {
            for name in util.list_tables().await? {
                println!("{name}");
            }
        }
        Some(Command::Insert {
            title,
            year,
            rating,
            plot,
        }) => {
            let mut movie = Movie::new(title, year, Default::default());
            movie
                .info
                .insert(INFO_RATING.to_string(), InfoValue::Float(rating));
            movie
                .info
                .insert(INFO_PLOT.to_string(), InfoValue::String(plot));
            runner.add_movie(&movie).await?
        }
        Some(Command::UpdateRating {
            title,
            year,
            rating,
        }) => {
            runner
                .update_rating(&MovieKey::new(year, title)?, rating)
                .await?
        }
        Some(Command::Delete { title, year }) => {
            runner.delete_movie(&MovieKey::new(year, title)?).await?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
