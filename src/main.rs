use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skilltrail::config::Config;
use skilltrail::models::{Difficulty, RoadmapId, SavedRoadmap};
use skilltrail::pipeline::{GeneratorClient, RecommenderClient, RoadmapSession};
use skilltrail::progress::{ProgressSync, ProgressTracker};
use skilltrail::store::{LocalStore, RemoteStore, RoadmapStore};

#[derive(Parser)]
#[command(name = "skilltrail")]
#[command(about = "AI-generated learning roadmaps with tutorial videos and synced progress")]
struct Cli {
    /// Owner identity for the remote backend. Omit to work as a guest
    /// against the on-device store.
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a roadmap and look up a tutorial video for every task
    Generate {
        /// What to learn, e.g. "Rust"
        topic: String,
        /// Why / toward what end, e.g. "build a web service"
        goal: String,
        #[arg(short, long, value_enum, default_value_t = Difficulty::Beginner)]
        difficulty: Difficulty,
        /// Persist the roadmap after generation ("start learning")
        #[arg(short, long)]
        save: bool,
    },
    /// List saved roadmaps (local always; remote too with --owner)
    List,
    /// Show one saved roadmap
    Show { id: RoadmapId },
    /// Rename a saved roadmap's topic
    Rename { id: RoadmapId, new_topic: String },
    /// Delete a saved roadmap
    Delete { id: RoadmapId },
    /// Toggle completion of one task (requires --owner)
    Toggle { id: RoadmapId, task_title: String },
    /// Follow live progress updates for a roadmap (requires --owner)
    Watch { id: RoadmapId },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "skilltrail=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<RoadmapStore> {
    let local = match &config.data_dir {
        Some(dir) => LocalStore::open(dir.join("skilltrail.db"))?,
        None => LocalStore::open_default()?,
    };
    local.migrate()?;
    let remote = RemoteStore::new(config.sync_url.clone(), config.api_key.clone());
    Ok(RoadmapStore::new(local, remote))
}

fn print_roadmap(roadmap: &SavedRoadmap) {
    let origin = if roadmap.is_local() { "local" } else { "remote" };
    println!(
        "{}  [{}]  {} ({})",
        roadmap.id, origin, roadmap.topic, roadmap.difficulty
    );
    for module in &roadmap.content.modules {
        println!("  {}", module.title);
        for task in &module.tasks {
            let time = roadmap
                .content
                .video_resources
                .get(&task.title)
                .and_then(|r| r.selected_video.as_ref())
                .and_then(|v| v.timestamp.clone())
                .unwrap_or_else(|| format!("{} min", task.estimated_minutes));
            println!("    - {} ({})", task.title, time);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Generate {
            topic,
            goal,
            difficulty,
            save,
        } => {
            let store = open_store(&config)?;
            let mut session = RoadmapSession::new(
                GeneratorClient::new(config.generator_url.clone()),
                RecommenderClient::new(config.recommender_url.clone()),
                store,
            );
            session.generate(&topic, &goal, difficulty).await?;
            if session.enrichment().any_loading() {
                println!("Looking up tutorial videos...");
            }
            session.await_enrichment().await;

            let Some(draft) = session.draft() else {
                anyhow::bail!("nothing generated: topic and goal must be non-empty");
            };
            println!("Roadmap for {} ({}):", draft.topic, draft.difficulty);
            for module in &draft.content.modules {
                println!("  {}", module.title);
                for task in &module.tasks {
                    let slot = session.enrichment().slot(&task.title);
                    match slot.and_then(|s| s.resource).and_then(|r| r.selected_video) {
                        Some(video) => {
                            println!("    - {}  [{} — {}]", task.title, video.title, video.url)
                        }
                        None => println!("    - {}  [no video found]", task.title),
                    }
                }
            }
            if let Some(hours) = session.total_hours_label() {
                println!("Total estimated time: {hours} hours");
            }

            if save {
                let id = session.start_learning(cli.owner.as_deref()).await?;
                println!("Saved as {id}");
            }
        }
        Commands::List => {
            let store = open_store(&config)?;
            let roadmaps = store.list_for_owner(cli.owner.as_deref()).await?;
            if roadmaps.is_empty() {
                println!("No saved roadmaps.");
            }
            for roadmap in roadmaps {
                let origin = if roadmap.is_local() { "local" } else { "remote" };
                println!("{}  [{}]  {}", roadmap.id, origin, roadmap.topic);
            }
        }
        Commands::Show { id } => {
            let store = open_store(&config)?;
            match store.get(&id).await? {
                Some(roadmap) => print_roadmap(&roadmap),
                None => anyhow::bail!("no roadmap with id {id}"),
            }
        }
        Commands::Rename { id, new_topic } => {
            let store = open_store(&config)?;
            store.rename(&id, &new_topic).await?;
            println!("Renamed {id}");
        }
        Commands::Delete { id } => {
            let store = open_store(&config)?;
            store.delete(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Toggle { id, task_title } => {
            let owner = cli
                .owner
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("progress tracking requires --owner"))?;
            let sync = ProgressSync::new(config.sync_url.clone(), config.api_key.clone());
            sync.toggle(owner, id.as_str(), &task_title).await?;
            println!("Toggled '{task_title}'");
        }
        Commands::Watch { id } => {
            let sync = ProgressSync::new(config.sync_url.clone(), config.api_key.clone());
            let mut tracker = ProgressTracker::attach(&sync, cli.owner.as_deref(), Some(&id))
                .ok_or_else(|| anyhow::anyhow!("progress tracking requires --owner"))?;
            println!("Watching progress for {id} (ctrl-c to stop)");
            loop {
                let done = tracker.completed();
                println!("{} task(s) completed: {:?}", done.len(), done);
                if !tracker.changed().await {
                    break;
                }
            }
        }
    }

    Ok(())
}
