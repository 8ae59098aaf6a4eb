use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use catalog::FilterSpec;
use clap::{Parser, Subcommand};
use foundation::GeoPoint;
use remote::{EvaluationMode, FilterPersistence, HttpBackend, RemoteError};
use tracing::error;
use tracing_subscriber::EnvFilter;
use viewer::session::{self, SessionOptions};
use viewer::{ApplyOutcome, Engine, EngineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless 3D building viewer with filter highlighting")]
struct Args {
    /// Backend API root
    #[arg(long, env = "VIEWER_API_URL", default_value = "http://localhost:5050/api")]
    api_url: String,

    /// Fixed reference point as LON,LAT (default: centre of the first footprint)
    #[arg(long, value_parser = parse_reference, allow_hyphen_values = true)]
    reference: Option<GeoPoint>,

    /// Presentation zoom factor
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Owner of saved filter sets
    #[arg(long, env = "VIEWER_USER")]
    user: Option<String>,

    /// Fetch buildings with their land-use district attached
    #[arg(long)]
    with_land_use: bool,

    /// Send one request per filter instead of a single batch
    #[arg(long)]
    per_query: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset and summarize the scene
    Show,

    /// Highlight buildings matching the given phrases
    Filter {
        /// One phrase per filter, e.g. "taller than 100"
        #[arg(required = true)]
        queries: Vec<String>,
    },

    /// Interactive session reading commands from stdin
    Interactive {
        /// Render tick in milliseconds
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
    },

    /// Manage saved filter sets
    Filters {
        #[command(subcommand)]
        action: FiltersAction,
    },
}

#[derive(Subcommand, Debug)]
enum FiltersAction {
    /// Create or overwrite a named set
    Save {
        name: String,
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Print a named set
    Load { name: String },
    /// Names of saved sets, newest first
    List,
    /// Remove a named set
    Delete { name: String },
}

fn parse_reference(text: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = text
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT, got {text:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let point = GeoPoint::new(lon, lat);
    if !point.is_valid() {
        return Err(format!("{text:?} is out of range"));
    }
    Ok(point)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if args.per_query {
        EvaluationMode::PerQuery
    } else {
        EvaluationMode::Batch
    };
    let backend = Arc::new(HttpBackend::new(args.api_url.clone()).with_mode(mode));
    let mut engine = Engine::new(EngineConfig {
        scale: args.scale,
        reference: args.reference,
        ..EngineConfig::default()
    });

    match args.command {
        Command::Show => {
            let stats = engine.reload(backend.as_ref(), args.with_land_use).await?;
            println!("{} building(s) loaded", engine.store().len());
            println!("{} drawn, {} skipped", stats.drawn, stats.skipped);
            if let Some(reference) = engine.reference() {
                println!(
                    "reference: {:.6}, {:.6}",
                    reference.longitude, reference.latitude
                );
            }
            let frame = engine.frame();
            println!(
                "frame {}: {} mesh(es), {} triangle(s)",
                frame.frame_index,
                frame.mesh_count(),
                frame.triangle_count()
            );
        }
        Command::Filter { queries } => {
            engine.reload(backend.as_ref(), args.with_land_use).await?;
            if let ApplyOutcome::Applied { highlighted } =
                engine.apply_queries(backend.as_ref(), queries).await?
            {
                println!("{highlighted} building(s) highlighted");
            }
            for failure in engine.last_failures() {
                println!("  {failure}");
            }
            for entry in engine.store().iter().filter(|b| b.presentation.highlighted) {
                println!(
                    "  {} filter {} {}",
                    entry.id(),
                    entry.presentation.owning_filter.unwrap_or_default(),
                    entry.presentation.display_color
                );
            }
        }
        Command::Interactive { tick_ms } => {
            if let Err(err) = engine.reload(backend.as_ref(), args.with_land_use).await {
                println!("no buildings loaded ({err}); use reload to retry");
            } else {
                println!("{} building(s) loaded", engine.store().len());
            }
            let options = SessionOptions {
                user: args.user,
                with_land_use: args.with_land_use,
                render_interval: Duration::from_millis(tick_ms.max(1)),
            };
            session::run_interactive(&mut engine, backend, options).await?;
        }
        Command::Filters { action } => {
            let user = args.user.ok_or("saved filters need --user or VIEWER_USER")?;
            filters(backend.as_ref(), user, action).await?;
        }
    }
    Ok(())
}

async fn filters(
    backend: &dyn FilterPersistence,
    user: String,
    action: FiltersAction,
) -> Result<(), RemoteError> {
    match action {
        FiltersAction::Save { name, queries } => {
            let filters = queries.into_iter().map(FilterSpec::new).collect();
            let outcome = backend.save(user, name.clone(), filters).await?;
            println!("{name}: {outcome:?}");
        }
        FiltersAction::Load { name } => {
            for filter in backend.load(user, name).await? {
                println!("{}", filter.query);
            }
        }
        FiltersAction::List => {
            for set in backend.list(user).await? {
                println!("{}\t{}", set.name, set.updated_at_ms);
            }
        }
        FiltersAction::Delete { name } => {
            backend.delete(user, name.clone()).await?;
            println!("deleted {name}");
        }
    }
    Ok(())
}
