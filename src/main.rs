use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use recap::config::{self, AppConfig};
use recap::{Difficulty, ItemEdit, ReviewEngine, SqliteStore, StudyItem};

/// Spaced repetition study scheduler
#[derive(Parser)]
#[command(name = "recap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schedule reviews and pick what to study next")]
struct Cli {
  /// SQLite database path (overrides config.toml and RECAP_DATABASE_PATH)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Add a new item, due immediately
  Add {
    question: String,
    solution: String,
    /// 1 (easy) to 5 (hard)
    #[arg(short, long, default_value_t = 2)]
    difficulty: u8,
  },

  /// Change an item's question, solution or difficulty
  Edit {
    id: Uuid,
    #[arg(long)]
    question: Option<String>,
    #[arg(long)]
    solution: Option<String>,
    #[arg(long)]
    difficulty: Option<u8>,
  },

  /// List items, optionally filtered by text
  List {
    #[arg(long)]
    search: Option<String>,
  },

  /// Items due now, most overdue first
  Due,

  /// Weighted random pick for practice
  Pick {
    /// Seed for a reproducible pick
    #[arg(long)]
    seed: Option<u64>,
  },

  /// Record a review
  Review {
    id: Uuid,
    /// Recall confidence, 1-5
    #[arg(short, long)]
    rating: u8,
    /// Mark the attempt as failed
    #[arg(long)]
    failed: bool,
  },

  /// Make an item (or every item) due now
  ForceDue {
    #[arg(required_unless_present = "all")]
    id: Option<Uuid>,
    #[arg(long, conflicts_with = "id")]
    all: bool,
  },

  /// Delete an item and its history
  Delete { id: Uuid },

  /// Delete every item
  Reset {
    /// Confirm deletion
    #[arg(long)]
    yes: bool,
  },

  /// Collection summary
  Stats,

  /// Selection weight of every item
  Weights,
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let config = AppConfig::load()?;

  // Logs go to stderr so stdout stays clean for --json
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter().into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let db_path = config::resolve_database_path(cli.db, &config);
  let store = SqliteStore::open(&db_path)
    .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
  let engine = ReviewEngine::new(store);

  run(&engine, cli.command, cli.json, Utc::now())
}

fn run(
  engine: &ReviewEngine<SqliteStore>,
  command: Commands,
  json: bool,
  now: DateTime<Utc>,
) -> anyhow::Result<()> {
  match command {
    Commands::Add {
      question,
      solution,
      difficulty,
    } => {
      let item = engine.add_item(&question, &solution, difficulty, now)?;
      emit(json, &item, || println!("Added {}", item.id))
    }

    Commands::Edit {
      id,
      question,
      solution,
      difficulty,
    } => {
      let edit = ItemEdit {
        question,
        solution,
        difficulty: difficulty.map(Difficulty::new).transpose()?,
      };
      let item = engine.edit_item(id, edit)?;
      emit(json, &item, || print_item(&item, now))
    }

    Commands::List { search } => {
      let items = engine.search(search.as_deref().unwrap_or(""))?;
      emit(json, &items, || print_items(&items, now))
    }

    Commands::Due => {
      let items = engine.due_now(now)?;
      let next = if items.is_empty() {
        engine.next_review_time(now)?
      } else {
        None
      };
      emit(json, &items, || match next {
        _ if !items.is_empty() => print_items(&items, now),
        Some(at) => println!("All caught up. Next review {}", relative(at, now)),
        None => println!("All caught up."),
      })
    }

    Commands::Pick { seed } => {
      let picked = match seed {
        Some(seed) => engine.pick_next(&mut StdRng::seed_from_u64(seed), now)?,
        None => engine.pick_next(&mut rand::rng(), now)?,
      };
      emit(json, &picked, || match &picked {
        Some(item) => {
          print_item(item, now);
          println!("\n{}", item.question);
        }
        None => println!("No items yet."),
      })
    }

    Commands::Review { id, rating, failed } => {
      let (item, outcome) = engine.submit_review_by_id(id, !failed, rating, now)?;
      emit(json, &outcome, || {
        println!(
          "Recorded. Confidence {:.2}, next review {} ({:.1}h)",
          item.confidence(),
          relative(outcome.next_review, now),
          outcome.interval_hours
        )
      })
    }

    Commands::ForceDue { id, all } => {
      let count = match id {
        Some(id) if !all => {
          engine.force_due(id, now)?;
          1
        }
        _ => engine.make_all_due(now)?,
      };
      emit(json, &count, || println!("{} item(s) due now", count))
    }

    Commands::Delete { id } => {
      engine.delete_item(id)?;
      emit(json, &id, || println!("Deleted {}", id))
    }

    Commands::Reset { yes } => {
      if !yes {
        bail!("Refusing to delete every item without --yes");
      }
      let removed = engine.reset()?;
      emit(json, &removed, || println!("Deleted {} item(s)", removed))
    }

    Commands::Stats => {
      let stats = engine.stats(now)?;
      emit(json, &stats, || {
        println!("Items:      {}", stats.total);
        println!("Due:        {}", stats.due);
        println!("Completed:  {}", stats.completed);
        println!("Attempts:   {}", stats.attempts);
        match stats.average_confidence {
          Some(avg) => println!("Confidence: {:.2}", avg),
          None => println!("Confidence: n/a"),
        }
      })
    }

    Commands::Weights => {
      let weights = engine.weights(now)?;
      let rows: Vec<WeightRow<'_>> = weights
        .iter()
        .map(|(item, weight)| WeightRow {
          id: item.id,
          question: &item.question,
          weight: *weight,
        })
        .collect();
      emit(json, &rows, || {
        for row in &rows {
          println!("{:>6}  {}  {}", row.weight, row.id, row.question);
        }
      })
    }
  }
}

#[derive(Serialize)]
struct WeightRow<'a> {
  id: Uuid,
  question: &'a str,
  weight: u64,
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  } else {
    text();
  }
  Ok(())
}

fn print_items(items: &[StudyItem], now: DateTime<Utc>) {
  if items.is_empty() {
    println!("No items.");
  }
  for item in items {
    print_item(item, now);
  }
}

fn print_item(item: &StudyItem, now: DateTime<Utc>) {
  let when = if item.is_due(now) {
    "due now".to_string()
  } else {
    relative(item.next_review(), now)
  };
  let success = item
    .success_rate()
    .map(|rate| format!("{:.0}%", rate * 100.0))
    .unwrap_or_else(|| "n/a".to_string());

  println!(
    "{}  {:<12}  conf {:.1}  diff {}  success {:>4}  {}",
    item.id,
    when,
    item.confidence(),
    item.difficulty.get(),
    success,
    item.question
  );
}

fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let minutes = (at - now).num_minutes();
  if minutes < 60 {
    format!("in {}m", minutes.max(0))
  } else if minutes < 48 * 60 {
    format!("in {}h", minutes / 60)
  } else {
    format!("in {}d", minutes / (24 * 60))
  }
}
