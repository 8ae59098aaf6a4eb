//! Interactive session: one current-thread loop over stdin commands, remote
//! completions and a render tick.

use std::sync::Arc;
use std::time::Duration;

use buildings::Building;
use catalog::{FilterSetSummary, FilterSpec, SaveOutcome};
use remote::{BuildingSource, Evaluation, FilterEvaluator, FilterPersistence, RemoteError};
use runtime::{Event, Ticket};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{ApplyOutcome, Engine, ViewerEvent};

/// Backend used by the session for every remote concern.
pub trait Backend: BuildingSource + FilterEvaluator + FilterPersistence + 'static {}

impl<T: BuildingSource + FilterEvaluator + FilterPersistence + 'static> Backend for T {}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Filter(Vec<String>),
    Clear,
    Pick { x: f64, y: f64 },
    Save(String),
    Load(String),
    List,
    Delete(String),
    Reload,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Filter phrases are separated by `;`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));
        let name = |what: &str| {
            if rest.is_empty() {
                Err(format!("{what} needs a filter set name"))
            } else {
                Ok(rest.to_string())
            }
        };
        match word {
            "filter" => {
                let queries: Vec<String> = rest
                    .split(';')
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string)
                    .collect();
                if queries.is_empty() {
                    Err("filter needs at least one phrase".to_string())
                } else {
                    Ok(Command::Filter(queries))
                }
            }
            "clear" => Ok(Command::Clear),
            "pick" => {
                let mut coords = rest.split_whitespace().map(str::parse::<f64>);
                match (coords.next(), coords.next(), coords.next()) {
                    (Some(Ok(x)), Some(Ok(y)), None) => Ok(Command::Pick { x, y }),
                    _ => Err("usage: pick X Y".to_string()),
                }
            }
            "save" => name("save").map(Command::Save),
            "load" => name("load").map(Command::Load),
            "delete" => name("delete").map(Command::Delete),
            "list" => Ok(Command::List),
            "reload" => Ok(Command::Reload),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command {other:?} (try help)")),
        }
    }
}

const HELP: &str = "commands: filter A; B | clear | pick X Y | save NAME | load NAME | list | delete NAME | reload | quit";

/// Result of a spawned remote call, delivered back to the loop.
enum Completion {
    Filters {
        ticket: Ticket,
        queries: Vec<String>,
        outcome: Result<Evaluation, RemoteError>,
    },
    Reloaded(Result<Vec<Building>, RemoteError>),
    Saved {
        name: String,
        outcome: Result<SaveOutcome, RemoteError>,
    },
    Loaded {
        name: String,
        outcome: Result<Vec<FilterSpec>, RemoteError>,
    },
    Listed(Result<Vec<FilterSetSummary>, RemoteError>),
    Deleted {
        name: String,
        outcome: Result<(), RemoteError>,
    },
}

pub struct SessionOptions {
    pub user: Option<String>,
    pub with_land_use: bool,
    pub render_interval: Duration,
}

/// Runs until `quit` or end of input. Remote calls are spawned so commands
/// stay responsive while they are in flight; filter completions carry their
/// supersede ticket.
pub async fn run_interactive<B: Backend>(
    engine: &mut Engine,
    backend: Arc<B>,
    options: SessionOptions,
) -> std::io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(options.render_interval);
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match Command::parse(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                dispatch(engine, &backend, &options, &tx, command);
            }
            Some(done) = rx.recv() => {
                complete(engine, &backend, &tx, done);
            }
            _ = tick.tick() => {
                let frame = engine.frame();
                debug!(
                    frame = frame.frame_index,
                    meshes = frame.mesh_count(),
                    triangles = frame.triangle_count(),
                    "frame"
                );
            }
        }
        print_events(engine.drain_events());
    }
    Ok(())
}

fn start_filters<B: Backend>(
    engine: &Engine,
    backend: &Arc<B>,
    tx: &mpsc::UnboundedSender<Completion>,
    queries: Vec<String>,
) {
    let ticket = engine.begin_filters();
    let backend = Arc::clone(backend);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = backend.evaluate(queries.clone()).await;
        let _ = tx.send(Completion::Filters {
            ticket,
            queries,
            outcome,
        });
    });
}

fn dispatch<B: Backend>(
    engine: &mut Engine,
    backend: &Arc<B>,
    options: &SessionOptions,
    tx: &mpsc::UnboundedSender<Completion>,
    command: Command,
) {
    let user = || {
        let user = options.user.clone();
        if user.is_none() {
            println!("saved filters need --user");
        }
        user
    };
    let spawn = |job: std::pin::Pin<Box<dyn std::future::Future<Output = Completion> + Send>>| {
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(job.await);
        });
    };

    match command {
        Command::Filter(queries) => start_filters(engine, backend, tx, queries),
        Command::Clear => {
            engine.clear_filters();
            println!("filters cleared");
        }
        Command::Pick { x, y } => {
            engine.pointer(x, y);
        }
        Command::Reload => {
            let backend = Arc::clone(backend);
            let with_land_use = options.with_land_use;
            spawn(Box::pin(async move {
                Completion::Reloaded(backend.fetch_buildings(with_land_use).await)
            }));
        }
        Command::Save(name) => {
            let Some(user) = user() else { return };
            if engine.active_filters().is_empty() {
                println!("no active filters to save");
                return;
            }
            let filters = engine.active_filters().to_vec();
            let backend = Arc::clone(backend);
            spawn(Box::pin(async move {
                let outcome = backend.save(user, name.clone(), filters).await;
                Completion::Saved { name, outcome }
            }));
        }
        Command::Load(name) => {
            let Some(user) = user() else { return };
            let backend = Arc::clone(backend);
            spawn(Box::pin(async move {
                let outcome = backend.load(user, name.clone()).await;
                Completion::Loaded { name, outcome }
            }));
        }
        Command::List => {
            let Some(user) = user() else { return };
            let backend = Arc::clone(backend);
            spawn(Box::pin(async move { Completion::Listed(backend.list(user).await) }));
        }
        Command::Delete(name) => {
            let Some(user) = user() else { return };
            let backend = Arc::clone(backend);
            spawn(Box::pin(async move {
                let outcome = backend.delete(user, name.clone()).await;
                Completion::Deleted { name, outcome }
            }));
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn complete<B: Backend>(
    engine: &mut Engine,
    backend: &Arc<B>,
    tx: &mpsc::UnboundedSender<Completion>,
    done: Completion,
) {
    match done {
        Completion::Filters {
            ticket,
            queries,
            outcome,
        } => match outcome {
            Ok(evaluation) => match engine.apply_evaluation(ticket, &queries, &evaluation) {
                ApplyOutcome::Applied { highlighted } => {
                    println!("{highlighted} building(s) highlighted");
                    for failure in engine.last_failures() {
                        println!("  {failure}");
                    }
                }
                ApplyOutcome::Superseded => {}
            },
            Err(err) if engine.gate().is_current(ticket) => {
                println!("filter evaluation failed: {err}");
            }
            Err(err) => debug!(%err, "superseded evaluation failed"),
        },
        Completion::Reloaded(Ok(buildings)) => {
            let stats = engine.load_buildings(buildings);
            println!("{} building(s) drawn, {} skipped", stats.drawn, stats.skipped);
        }
        Completion::Reloaded(Err(err)) => {
            println!("reload failed, keeping {} building(s): {err}", engine.store().len());
        }
        Completion::Saved { name, outcome } => match outcome {
            Ok(SaveOutcome::Created) => println!("saved {name:?}"),
            Ok(SaveOutcome::Updated) => println!("updated {name:?}"),
            Err(err) => println!("save failed: {err}"),
        },
        Completion::Loaded { name, outcome } => match outcome {
            Ok(filters) => {
                let queries: Vec<String> = filters.into_iter().map(|f| f.query).collect();
                println!("loaded {name:?}: {}", queries.join("; "));
                if queries.is_empty() {
                    engine.clear_filters();
                } else {
                    start_filters(engine, backend, tx, queries);
                }
            }
            Err(RemoteError::NotFound) => println!("no filter set named {name:?}"),
            Err(err) => println!("load failed: {err}"),
        },
        Completion::Listed(outcome) => match outcome {
            Ok(sets) if sets.is_empty() => println!("no saved filter sets"),
            Ok(sets) => {
                for set in sets {
                    println!("  {} (updated {})", set.name, set.updated_at_ms);
                }
            }
            Err(err) => println!("list failed: {err}"),
        },
        Completion::Deleted { name, outcome } => match outcome {
            Ok(()) => println!("deleted {name:?}"),
            Err(RemoteError::NotFound) => println!("no filter set named {name:?}"),
            Err(err) => {
                warn!(%err, "delete failed");
                println!("delete failed: {err}");
            }
        },
    }
}

pub fn print_events(events: Vec<Event<ViewerEvent>>) {
    for event in events {
        match event.payload {
            ViewerEvent::BuildingSelected { building, local } => {
                println!("selected building {}", building.id);
                println!("  local: x={:.1} m, y={:.1} m", local.x, local.y);
                if let Some(height) = building.height() {
                    println!("  height: {height:.1} m");
                }
                if let Some(land_use) = &building.land_use {
                    let describe = land_use
                        .description
                        .as_deref()
                        .or(land_use.label.as_deref())
                        .unwrap_or("-");
                    println!(
                        "  land use: {} ({describe})",
                        land_use.code.as_deref().unwrap_or("-")
                    );
                }
            }
            ViewerEvent::BuildingDeselected => println!("nothing selected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Command;
    use pretty_assertions::assert_eq;

    #[test]
    fn filter_phrases_split_on_semicolons() {
        assert_eq!(
            Command::parse("filter taller than 50;  zoned R-C1 ;").expect("parse"),
            Command::Filter(vec!["taller than 50".to_string(), "zoned R-C1".to_string()])
        );
        assert!(Command::parse("filter ;").is_err());
    }

    #[test]
    fn pick_needs_two_numbers() {
        assert_eq!(
            Command::parse("pick 400 300.5").expect("parse"),
            Command::Pick { x: 400.0, y: 300.5 }
        );
        assert!(Command::parse("pick 400").is_err());
        assert!(Command::parse("pick a b").is_err());
        assert!(Command::parse("pick 1 2 3").is_err());
    }

    #[test]
    fn names_keep_inner_spaces() {
        assert_eq!(
            Command::parse("save  downtown towers ").expect("parse"),
            Command::Save("downtown towers".to_string())
        );
        assert!(Command::parse("load").is_err());
        assert_eq!(Command::parse("quit").expect("parse"), Command::Quit);
        assert!(Command::parse("jump").is_err());
    }
}
