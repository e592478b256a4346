//! toolshelf: browse, filter and bookmark the developer tool catalog from a
//! terminal.
//!
//! Bookmarks and recent searches persist in a JSON storage file shared by
//! every invocation, the same way browser tabs share local storage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolshelf_core::{
    defaults, Analytics, Catalog, Category, CategoryFilter, ShelfConfig, SortKey, Tool,
    TracingSink,
};
use toolshelf_search::{url_params, MemoryHistory, SearchSession};
use toolshelf_store::{BookmarkSet, FileBackend, RecentSearches, StorageArea};

#[derive(Parser)]
#[command(name = "toolshelf")]
#[command(author, version, about = "Browse and bookmark developer tools")]
#[command(propagate_version = true)]
struct Cli {
    /// Storage file (overrides SHELF_STORAGE_PATH)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Catalog JSON file (overrides SHELF_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tools from the catalog
    List {
        /// Category name or "all"
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,

        /// Only tools carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Featured tools (six unless --limit is given)
        #[arg(long, conflicts_with_all = ["newest", "free"])]
        featured: bool,

        /// Newest releases, most recent first (six unless --limit is given)
        #[arg(long, conflicts_with = "free")]
        newest: bool,

        /// Free tools only
        #[arg(long)]
        free: bool,

        /// Maximum number of tools to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one tool and similar ones
    Show {
        /// Tool id
        id: String,

        /// Number of similar tools to list
        #[arg(short, long, default_value_t = defaults::SIMILAR_LIMIT)]
        similar: usize,
    },

    /// Filter and sort the catalog
    Search(SearchArgs),

    /// Manage bookmarks
    Bookmarks {
        #[command(subcommand)]
        action: Option<BookmarkAction>,
    },

    /// Manage recent searches
    Recent {
        #[command(subcommand)]
        action: Option<RecentAction>,
    },

    /// List categories and tags with tool counts
    Facets,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query
    query: Option<String>,

    /// Start from a URL query string, e.g. "categories=frontend&sortBy=stars"
    #[arg(long)]
    url: Option<String>,

    /// Category to include (repeatable)
    #[arg(short, long)]
    category: Vec<Category>,

    /// Tag to include (repeatable)
    #[arg(short, long)]
    tag: Vec<String>,

    /// Free tools only
    #[arg(long)]
    free: bool,

    /// Tools with a free tier only
    #[arg(long)]
    free_tier: bool,

    /// New releases only
    #[arg(long)]
    new: bool,

    /// Featured tools only
    #[arg(long)]
    featured: bool,

    /// Sort order: name, stars or newest
    #[arg(short, long)]
    sort: Option<SortKey>,
}

#[derive(Subcommand)]
enum BookmarkAction {
    /// List bookmarked tools
    List,
    /// Bookmark a tool
    Add { id: String },
    /// Remove a bookmark
    Remove { id: String },
    /// Flip a bookmark
    Toggle { id: String },
    /// Remove every bookmark
    Clear,
    /// Drop bookmarks whose tool is no longer in the catalog
    Prune,
}

#[derive(Subcommand)]
enum RecentAction {
    /// List recent searches
    List,
    /// Forget one search term
    Remove { term: String },
    /// Forget every search term
    Clear,
}

/// Everything a command needs, built once per invocation.
struct App {
    config: ShelfConfig,
    catalog: Arc<Catalog>,
    analytics: Analytics,
    area: StorageArea,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    let app = build_app(&cli)?;

    match cli.command {
        Commands::List {
            category,
            tag,
            featured,
            newest,
            free,
            limit,
        } => cmd_list(&app, category, tag.as_deref(), featured, newest, free, limit),
        Commands::Show { id, similar } => cmd_show(&app, &id, similar),
        Commands::Search(args) => cmd_search(&app, args),
        Commands::Bookmarks { action } => {
            cmd_bookmarks(&app, action.unwrap_or(BookmarkAction::List)).await
        }
        Commands::Recent { action } => cmd_recent(&app, action.unwrap_or(RecentAction::List)),
        Commands::Facets => cmd_facets(&app),
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "toolshelf=info")
///
/// Console output goes to stderr so command output stays pipeable.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "toolshelf=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("toolshelf.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn build_app(cli: &Cli) -> anyhow::Result<App> {
    let mut config = ShelfConfig::from_env();
    if let Some(path) = &cli.storage {
        config.storage_path = path.clone();
    }
    if let Some(path) = &cli.catalog {
        config.catalog_path = Some(path.clone());
    }

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::bundled().context("bundled catalog is invalid")?,
    };

    let analytics = Analytics::from_config(Arc::new(TracingSink), &config);
    let area = StorageArea::new(Arc::new(FileBackend::new(&config.storage_path)));

    info!(
        storage = %config.storage_path.display(),
        tool_count = catalog.len(),
        analytics = config.analytics_enabled,
        "toolshelf ready"
    );

    Ok(App {
        config,
        catalog: Arc::new(catalog),
        analytics,
        area,
        json: cli.json,
    })
}

fn cmd_list(
    app: &App,
    category: CategoryFilter,
    tag: Option<&str>,
    featured: bool,
    newest: bool,
    free: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let tools = select_tools(&app.catalog, category, tag, featured, newest, free, limit);
    print_tools(app, tools)
}

/// Listing for `list`. Category and tag narrow the full listing before the
/// limit applies; featured and newest listings default to their landing size.
fn select_tools<'a>(
    catalog: &'a Catalog,
    category: CategoryFilter,
    tag: Option<&str>,
    featured: bool,
    newest: bool,
    free: bool,
    limit: Option<usize>,
) -> Vec<&'a Tool> {
    let (mut tools, default_limit): (Vec<&Tool>, Option<usize>) = if featured {
        (catalog.featured(None), Some(defaults::FEATURED_LIMIT))
    } else if newest {
        (catalog.newest(None), Some(defaults::NEWEST_LIMIT))
    } else if free {
        (catalog.free(), None)
    } else {
        (catalog.all().iter().collect(), None)
    };

    if let CategoryFilter::Only(only) = category {
        tools.retain(|t| t.category == only);
    }
    if let Some(tag) = tag {
        tools.retain(|t| t.has_tag(tag));
    }
    if let Some(limit) = limit.or(default_limit) {
        tools.truncate(limit);
    }
    tools
}

fn cmd_show(app: &App, id: &str, similar: usize) -> anyhow::Result<()> {
    let Some(tool) = app.catalog.get(id) else {
        bail!("no tool with id '{}'", id);
    };
    let similar = app.catalog.similar(tool, similar);

    if app.json {
        let doc = serde_json::json!({ "tool": tool, "similar": similar });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} ({})", tool.name, tool.id);
    println!("  category:     {}", tool.category.label());
    if !tool.description.is_empty() {
        println!("  description:  {}", tool.description);
    }
    if !tool.tags.is_empty() {
        println!("  tags:         {}", tool.tags.join(", "));
    }
    println!("  pricing:      {}", pricing(tool));
    if let Some(stars) = tool.stars {
        println!("  rating:       {:.1}", stars);
    }
    println!("  last updated: {}", tool.last_updated);
    if let Some(website) = &tool.website {
        println!("  website:      {}", website);
    }
    if !similar.is_empty() {
        println!("\nSimilar:");
        for other in similar {
            println!("  {}", summary(other));
        }
    }
    Ok(())
}

fn cmd_search(app: &App, args: SearchArgs) -> anyhow::Result<()> {
    let history = Arc::new(MemoryHistory::new(args.url.clone().unwrap_or_default()));
    let mut session = SearchSession::with_history(
        app.catalog.clone(),
        app.analytics.clone(),
        &app.config,
        history,
    );

    session.update_spec(|spec| {
        if let Some(query) = &args.query {
            spec.query = query.clone();
        }
        spec.categories.extend(args.category.iter().copied());
        spec.tags.extend(args.tag.iter().cloned());
        spec.free_only |= args.free;
        spec.free_tier_only |= args.free_tier;
        spec.new_only |= args.new;
        spec.featured_only |= args.featured;
        if let Some(sort_by) = args.sort {
            spec.sort_by = sort_by;
        }
    });
    session.flush();

    let spec = session.spec();
    if let Some(query) = spec.text_query() {
        let mut recent = RecentSearches::new(
            app.area.open_tab(),
            app.config.recent_search_limit,
            app.analytics.clone(),
        );
        recent.record(query);
    }

    let results = session.results();
    if !app.json {
        let url = url_params::to_query(&spec);
        if !url.is_empty() {
            println!("?{}", url);
        }
        println!("{} result(s)", results.len());
    }
    print_tools(app, results.iter().collect())
}

async fn cmd_bookmarks(app: &App, action: BookmarkAction) -> anyhow::Result<()> {
    let mut bookmarks = BookmarkSet::from_config(
        app.area.open_tab(),
        app.catalog.clone(),
        app.analytics.clone(),
        &app.config,
    );
    bookmarks.load().await;

    match action {
        BookmarkAction::List => {
            let unresolved = bookmarks.len() - bookmarks.tools().len();
            print_tools(app, bookmarks.tools().iter().collect())?;
            if unresolved > 0 && !app.json {
                println!(
                    "({} bookmark(s) no longer in the catalog; run `toolshelf bookmarks prune`)",
                    unresolved
                );
            }
        }
        BookmarkAction::Add { id } => {
            require_known(app, &id)?;
            if bookmarks.save(&id) {
                println!("Saved {}", id);
            } else {
                println!("{} is already saved", id);
            }
        }
        BookmarkAction::Remove { id } => {
            if bookmarks.remove(&id) {
                println!("Removed {}", id);
            } else {
                println!("{} is not saved", id);
            }
        }
        BookmarkAction::Toggle { id } => {
            if !bookmarks.is_saved(&id) {
                require_known(app, &id)?;
            }
            if bookmarks.toggle(&id) {
                println!("Saved {}", id);
            } else {
                println!("Removed {}", id);
            }
        }
        BookmarkAction::Clear => {
            println!("Cleared {} bookmark(s)", bookmarks.clear_all());
        }
        BookmarkAction::Prune => {
            println!("Pruned {} bookmark(s)", bookmarks.prune_unresolved());
        }
    }
    Ok(())
}

fn cmd_recent(app: &App, action: RecentAction) -> anyhow::Result<()> {
    let mut recent = RecentSearches::new(
        app.area.open_tab(),
        app.config.recent_search_limit,
        app.analytics.clone(),
    );
    match action {
        RecentAction::List => {
            let terms = recent.list();
            if app.json {
                println!("{}", serde_json::to_string_pretty(terms)?);
            } else {
                for term in terms {
                    println!("{}", term);
                }
            }
        }
        RecentAction::Remove { term } => {
            if recent.remove(&term) {
                println!("Forgot '{}'", term);
            } else {
                println!("'{}' is not a recent search", term);
            }
        }
        RecentAction::Clear => {
            println!("Cleared {} search(es)", recent.clear());
        }
    }
    Ok(())
}

fn cmd_facets(app: &App) -> anyhow::Result<()> {
    let categories = app.catalog.category_counts();
    let tags = app.catalog.tag_counts();

    if app.json {
        let categories: serde_json::Map<String, serde_json::Value> = categories
            .iter()
            .map(|(c, n)| (c.to_string(), (*n).into()))
            .collect();
        let tags: serde_json::Map<String, serde_json::Value> =
            tags.iter().map(|(t, n)| (t.clone(), (*n).into())).collect();
        let doc = serde_json::json!({ "categories": categories, "tags": tags });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Categories:");
    for (category, count) in categories {
        println!("  {:<14} {:>3}  ({})", category.as_str(), count, category.label());
    }
    println!("\nTags:");
    for (tag, count) in tags {
        println!("  {:<14} {:>3}", tag, count);
    }
    Ok(())
}

fn require_known(app: &App, id: &str) -> anyhow::Result<()> {
    if !app.catalog.contains(id) {
        bail!("no tool with id '{}'", id);
    }
    Ok(())
}

fn print_tools(app: &App, tools: Vec<&Tool>) -> anyhow::Result<()> {
    if app.json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }
    for tool in tools {
        println!("{}", summary(tool));
    }
    Ok(())
}

fn summary(tool: &Tool) -> String {
    let mut markers = Vec::new();
    if tool.is_new {
        markers.push("new");
    }
    if tool.is_featured {
        markers.push("featured");
    }
    let stars = tool
        .stars
        .map(|s| format!("{:.1}", s))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{:<16} {:<22} {:<12} {:>4}  {}",
        tool.id,
        tool.name,
        tool.category.as_str(),
        stars,
        pricing(tool)
    );
    if !markers.is_empty() {
        line.push_str(&format!("  [{}]", markers.join(", ")));
    }
    line
}

fn pricing(tool: &Tool) -> &'static str {
    if tool.is_free {
        "free"
    } else if tool.has_free_tier {
        "free tier"
    } else {
        "paid"
    }
}
