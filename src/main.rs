use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use pet_rentals::backend::BackendAdapter;
use pet_rentals::config::AppConfig;
use pet_rentals::display::ListingCard;
use pet_rentals::enquiry::{EnquiryForm, LogEnquirySink, SubmitError};
use pet_rentals::logging;
use pet_rentals::models::{Listing, ListingId, Role, UserMetadata};
use pet_rentals::pipeline::{ListingQuery, ListingView, PropertyType, SortKey};
use pet_rentals::search::SearchController;
use pet_rentals::session::SessionStore;
use pet_rentals::storage::LocalStorage;

#[derive(Parser, Debug)]
#[command(name = "pet-rentals", version, long_about = None)]
#[command(about = "Browse pet-friendly rentals and manage your account")]
struct Cli {
    /// Backend project URL (overrides SUPABASE_URL)
    #[arg(long, global = true)]
    supabase_url: Option<String>,

    /// Backend public API key (overrides SUPABASE_ANON_KEY)
    #[arg(long, global = true)]
    anon_key: Option<String>,

    /// Local storage file
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Log level for this crate (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// studio, one-bed, two-bed, three-bed, house-share, furnished, unfurnished
    #[arg(long = "type")]
    property_type: Option<PropertyType>,

    /// Only listings that look pet-friendly
    #[arg(long)]
    pet_friendly: bool,

    /// newest, oldest, cheapest, expensive, bedrooms-asc, bedrooms-desc
    #[arg(long, default_value = "newest")]
    sort: SortKey,
}

impl FilterArgs {
    fn query(&self) -> ListingQuery {
        ListingQuery {
            property_type: self.property_type,
            pet_friendly_only: self.pet_friendly,
            sort: self.sort,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List, filter and sort listings
    Listings {
        /// Only listings whose location contains this text
        #[arg(short, long)]
        search: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Also save the shown listings as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Type location searches line by line; end a line with '!' to search immediately
    Search {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "PET_RENTALS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "tenant")]
        role: Role,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign in
    Login {
        email: String,
        #[arg(long, env = "PET_RENTALS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user and role
    Whoami,
    /// Show the signed-in user's profile
    Profile,
    /// Send an enquiry about a listing
    Enquire {
        listing_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(url) = &self.supabase_url {
            config.backend.url = Some(url.clone());
        }
        if let Some(key) = &self.anon_key {
            config.backend.anon_key = Some(key.clone());
        }
        if let Some(path) = &self.storage {
            config.storage_path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.log_json {
            config.log_json = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    cli.apply_to(&mut config);

    logging::init_tracing(&config.log_level, config.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "🐾 Pet-friendly rentals");

    let storage = LocalStorage::new(config.storage_path.clone());
    let adapter = BackendAdapter::from_config(config.backend.clone(), Some(storage.clone()))
        .context("Failed to set up backend client")?;

    match cli.command {
        Command::Listings {
            search,
            filters,
            json,
        } => {
            let raw = match search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(term) => adapter.search_listings_by_location(term).await,
                None => adapter.fetch_listings().await,
            };
            let shown = filters.query().apply(&raw);
            print_listings(&shown);

            if let Some(path) = json {
                let json = serde_json::to_string_pretty(&shown)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("💾 Saved {} listings to {}", shown.len(), path.display());
            }
        }
        Command::Search { filters } => {
            run_interactive_search(adapter, filters.query(), config.search_debounce()).await?;
        }
        Command::Signup {
            email,
            password,
            role,
            name,
            first_name,
            last_name,
            company,
            phone,
        } => {
            let store = SessionStore::new(adapter, storage);
            store.initialize().await;
            let metadata = UserMetadata {
                role: None,
                name,
                first_name,
                last_name,
                company,
                phone,
            };
            let user = store.sign_up(&email, &password, role, metadata).await?;
            println!("Signed up {} as {}", user.display_name(), user.role());
            store.shutdown();
        }
        Command::Login { email, password } => {
            let store = SessionStore::new(adapter, storage);
            store.initialize().await;
            let user = store.sign_in(&email, &password).await?;
            println!("Signed in as {} ({})", user.display_name(), user.role());
            store.shutdown();
        }
        Command::Logout => {
            let store = SessionStore::new(adapter, storage);
            store.initialize().await;
            store.sign_out().await?;
            println!("Signed out");
            store.shutdown();
        }
        Command::Whoami => {
            let store = SessionStore::new(adapter, storage);
            store.initialize().await;
            let state = store.snapshot();
            match (&state.user, state.role) {
                (Some(user), Some(role)) => {
                    println!("{} <{}>", user.display_name(), user.email.as_deref().unwrap_or("-"));
                    println!("   Role: {}", role);
                    println!("   ID: {}", user.id);
                }
                _ => println!("Not signed in"),
            }
            store.shutdown();
        }
        Command::Profile => {
            let store = SessionStore::new(adapter, storage);
            store.initialize().await;
            let Some(user) = store.snapshot().user else {
                bail!("Not signed in");
            };
            match store.adapter().fetch_profile(&user.id).await {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => {
                    warn!(user_id = %user.id, "No profile row, showing account metadata");
                    println!("{}", serde_json::to_string_pretty(&user)?);
                }
            }
            store.shutdown();
        }
        Command::Enquire {
            listing_id,
            name,
            email,
            message,
        } => {
            let listing_id = ListingId(listing_id);
            let listings = adapter.fetch_listings().await;
            if !listings.iter().any(|l| l.id == listing_id) {
                warn!(%listing_id, "Enquiry for a listing that is not currently shown");
            }

            let form = EnquiryForm {
                name,
                email,
                message,
            };
            match form.submit(&listing_id, &LogEnquirySink).await {
                Ok(enquiry) => println!("✅ Enquiry about listing {} sent", enquiry.listing_id),
                Err(SubmitError::Invalid(errors)) => {
                    for e in &errors.0 {
                        eprintln!("   {}: {}", e.field, e.message);
                    }
                    bail!("Enquiry not sent");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn print_listings(listings: &[Listing]) {
    if listings.is_empty() {
        println!("No listings match.");
        return;
    }
    for (i, listing) in listings.iter().enumerate() {
        println!("{}. {}", i + 1, ListingCard(listing));
        println!();
    }
    info!("Showing {} listings", listings.len());
}

/// Feed stdin lines to the debounced search and reprint whenever the raw set changes
async fn run_interactive_search(
    adapter: BackendAdapter,
    query: ListingQuery,
    debounce: Duration,
) -> Result<()> {
    let search = SearchController::new(adapter, debounce);
    search.load_all().await;

    let mut results = search.listings();
    let mut view = ListingView::new(search.current(), query);
    print_listings(view.listings());

    let printer = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let set = Arc::clone(&results.borrow_and_update());
            view.set_source(set);
            println!("---");
            print_listings(view.listings());
        }
    });

    let mut last_submit = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.strip_suffix('!') {
            Some(term) => last_submit = Some(search.submit(term.to_string())),
            None => {
                last_submit = None;
                search.input(line);
            }
        }
    }

    // stdin closed: wait for the last query, then for the printer to drain
    match last_submit {
        Some(query) => query.await?,
        None => search.flush().await,
    }
    drop(search);
    printer.await?;
    Ok(())
}
