//! Bazaar CLI - a command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the password can also come from BAZAAR_PASSWORD)
//! bazaar auth sign-in -e shopper@example.com
//!
//! # Browse the catalog
//! bazaar products list --category Electronics --sort price-asc --page 2
//!
//! # Fill the cart and check out with cash on delivery
//! bazaar cart add 6428ebc6
//! bazaar checkout --cash --address 65f1c2
//! ```
//!
//! # Commands
//!
//! - `auth` - Sign up, sign in/out, and password recovery
//! - `products` - Browse and search the catalog
//! - `cart` / `wishlist` - Manage the signed-in user's cart and wishlist
//! - `orders` - List past orders
//! - `checkout` - Place an order for the current cart
//! - `profile` / `addresses` - Account details and saved addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::num::NonZeroUsize;

use bazaar_storefront::catalog::SortOrder;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::{AppError, Storefront};
use clap::{ArgGroup, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account registration, sign-in and password recovery
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List past orders
    Orders,
    /// Place an order for the current cart
    Checkout(CheckoutArgs),
    /// View or edit the account profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage saved addresses
    Addresses {
        #[command(subcommand)]
        action: AddressesAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account
    SignUp {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password (defaults to --password)
        #[arg(long)]
        re_password: Option<String>,
        #[arg(long)]
        phone: String,
    },
    /// Sign in and persist the session
    SignIn {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Remove the persisted session
    SignOut,
    /// Show whether a session is present
    Status,
    /// Email a password reset code
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Verify an emailed reset code
    VerifyCode { code: String },
    /// Set a new password after verifying the code
    ResetPassword {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BAZAAR_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Filter, sort and page through the catalog
    List(ListArgs),
    /// Show one product
    Show { id: String },
    /// Best sellers
    Top {
        #[arg(short = 'n', long, default_value_t = 4)]
        count: usize,
    },
    /// Newest products
    New {
        #[arg(short = 'n', long, default_value_t = 4)]
        count: usize,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Match title or description, case-insensitively
    #[arg(short, long, default_value = "")]
    query: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    /// Upper bound on the price paid
    #[arg(long)]
    max_price: Option<Decimal>,
    /// featured, price-asc, price-desc, newest or top-rated
    #[arg(long, default_value_t = SortOrder::Featured)]
    sort: SortOrder,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<NonZeroUsize>,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and order summary
    Show,
    /// Add one unit of a product
    Add { product: String },
    /// Set a line's quantity
    Update { item: String, count: u32 },
    /// Remove a line
    Remove { item: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    Show,
    Add { product: String },
    Remove { product: String },
}

#[derive(Args)]
#[command(group(ArgGroup::new("method").required(true).args(["cash", "card"])))]
struct CheckoutArgs {
    /// Pay cash on delivery
    #[arg(long)]
    cash: bool,
    /// Pay by card on the hosted checkout page
    #[arg(long)]
    card: bool,
    /// Ship to a saved address (defaults to the first saved address)
    #[arg(long, conflicts_with_all = ["details", "phone", "city"])]
    address: Option<String>,
    #[arg(long, requires_all = ["phone", "city"])]
    details: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    city: Option<String>,
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    Update {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    ChangePassword {
        #[arg(long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        current_password: String,
        #[arg(long, env = "BAZAAR_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the new password (defaults to --password)
        #[arg(long)]
        re_password: Option<String>,
    },
}

#[derive(Args)]
struct AddressArgs {
    #[arg(short, long)]
    name: String,
    #[arg(short, long)]
    details: String,
    #[arg(short, long)]
    phone: String,
    #[arg(short, long)]
    city: String,
}

#[derive(Subcommand)]
enum AddressesAction {
    List,
    Add(AddressArgs),
    Update {
        id: String,
        #[command(flatten)]
        address: AddressArgs,
    },
    Delete { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.expose_secret(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_storefront=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        e.report();
        tracing::error!("{}", e.user_message("Command failed"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let storefront = Storefront::new(config)?;

    match cli.command {
        Commands::Auth { action } => commands::auth::run(&storefront, action).await,
        Commands::Products { action } => commands::products::run(&storefront, action).await,
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Wishlist { action } => commands::wishlist::run(&storefront, action).await,
        Commands::Orders => commands::orders::list(&storefront).await,
        Commands::Checkout(args) => commands::orders::checkout(&storefront, args).await,
        Commands::Profile { action } => commands::profile::run(&storefront, action).await,
        Commands::Addresses { action } => commands::profile::addresses(&storefront, action).await,
    }
}
