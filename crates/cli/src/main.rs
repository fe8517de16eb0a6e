//! Shop Now CLI - drive the product list against a live or demo backend.
//!
//! # Usage
//!
//! ```bash
//! # Load three pages of products and log the grid
//! shopnow browse --pages 3
//!
//! # Show the stored cart for a user
//! shopnow cart show --user uid-123
//!
//! # Add a product to a user's cart and wait for the write
//! shopnow cart add --user uid-123 --product rose-serum
//!
//! # Any command against in-memory sample data
//! shopnow --demo browse
//! ```
//!
//! # Commands
//!
//! - `browse` - Mount the product list and page through it
//! - `cart show` - Read the remote cart document
//! - `cart add` - Add a product through the product list screen

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use shopnow_client::ShopContext;
use shopnow_client::config::{ClientConfig, ListSettings};
use shopnow_client::telemetry::{DEFAULT_FILTER, init_sentry, init_tracing};
use shopnow_core::{ProductId, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "shopnow")]
#[command(author, version, about = "Shop Now product list client")]
struct Cli {
    /// Use in-memory sample data instead of the remote store
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through the product list
    Browse {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Inspect or change a user's cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    /// Show the stored cart document
    Show {
        /// User ID
        #[arg(short, long)]
        user: UserId,
    },
    /// Add a product and wait for the cart to be saved
    Add {
        /// User ID
        #[arg(short, long)]
        user: UserId,

        /// Product ID
        #[arg(short = 'P', long)]
        product: ProductId,

        /// Maximum number of pages to search for the product
        #[arg(short, long, default_value_t = 10)]
        pages: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration first (needed for Sentry init)
    let config = if cli.demo {
        Ok(None)
    } else {
        ClientConfig::from_env().map(Some)
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config
        .as_ref()
        .ok()
        .and_then(Option::as_ref)
        .and_then(|config| init_sentry(&config.sentry));

    init_tracing(DEFAULT_FILTER);

    let result = match config {
        Ok(config) => run(cli, config.as_ref()).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Option<&ClientConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let context = match config {
        Some(config) => ShopContext::remote(config)?,
        None => {
            tracing::info!("Using in-memory demo data");
            ShopContext::demo(ListSettings::default())
        }
    };

    match cli.command {
        Commands::Browse { pages } => commands::browse::run(context, pages).await?,
        Commands::Cart { action } => match action {
            CartCommand::Show { user } => commands::cart::show(&context, &user).await?,
            CartCommand::Add {
                user,
                product,
                pages,
            } => commands::cart::add(context, user, &product, pages).await?,
        },
    }
    Ok(())
}
