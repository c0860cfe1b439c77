//! Cart Example
//!
//! Drives a file-backed cart from the command line, using a catalog fixture
//! for products and promotions. The cart persists between runs.
//!
//! Use `-c` to choose the catalog file and `--storage-dir` / `--cart-key` to
//! choose where the cart lives.

use std::{io, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use jiff::Timestamp;
use tracing::info;

use vitrine::{
    cart::{CartEvent, CartStore},
    catalog::Catalog,
    config::{self, CartConfig, ConfigError},
    observability::init_subscriber,
    products::Product,
    storage::CartStorage,
};

/// Arguments for the cart example
#[derive(Debug, Parser)]
#[command(name = "cart", about = "Storefront cart example", long_about = None)]
struct CartArgs {
    /// Catalog fixture to load products and promotions from
    #[arg(
        short,
        long,
        env = "VITRINE_CATALOG",
        default_value = "fixtures/catalog/storefront.yml"
    )]
    catalog: PathBuf,

    #[command(flatten)]
    config: CartConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the cart
    List,

    /// Add one unit of a product, with its best current promotion
    Add {
        /// Product handle from the catalog
        handle: String,
    },

    /// Remove a product's line
    Remove {
        /// Product handle from the catalog
        handle: String,
    },

    /// Set a product's quantity; zero or less removes it
    Set {
        /// Product handle from the catalog
        handle: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Empty the cart
    Clear,

    /// Print the order summary and empty the cart
    Checkout,
}

/// Cart Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = match config::load::<CartArgs>() {
        Ok(args) => args,
        Err(ConfigError::Cli(err)) => err.exit(),
        Err(err) => return Err(err.into()),
    };

    init_subscriber(&args.config.logging)?;

    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let store = args.config.storage.open_store()?;

    if store.currency() != catalog.currency() {
        bail!(
            "catalog is priced in {} but the cart uses {}",
            catalog.currency().iso_alpha_code,
            store.currency().iso_alpha_code
        );
    }

    store
        .subscribe(|event: &CartEvent| info!(?event, "cart changed"))
        .detach();

    let now = Timestamp::now();

    match args.command {
        Command::List => {}
        Command::Add { handle } => {
            let product = find_product(&catalog, &handle)?;
            let promotion = catalog.promotion_for(product.id, now).cloned();

            store.add_to_cart(product.clone(), promotion);
        }
        Command::Remove { handle } => {
            store.remove_from_cart(find_product(&catalog, &handle)?.id);
        }
        Command::Set { handle, quantity } => {
            store.update_quantity(find_product(&catalog, &handle)?.id, quantity);
        }
        Command::Clear => {
            store.clear_cart();
        }
        Command::Checkout => {
            let summary = store.checkout(now)?;

            summary.write_to(io::stdout().lock())?;
            println!("\n{}", summary.message());

            return Ok(());
        }
    }

    print_cart(&store, &catalog, now)
}

fn find_product<'c>(catalog: &'c Catalog, handle: &str) -> Result<&'c Product> {
    catalog.product(handle).with_context(|| {
        format!(
            "unknown product {handle}; try one of: {}",
            catalog.product_handles().join(", ")
        )
    })
}

#[expect(clippy::print_stdout, reason = "Example code")]
fn print_cart<S: CartStorage>(
    store: &CartStore<S>,
    catalog: &Catalog,
    now: Timestamp,
) -> Result<()> {
    let cart = store.cart();

    if cart.is_empty() {
        println!("Cart is empty.");
        return Ok(());
    }

    for line in &cart {
        let handle = catalog.handle_of(line.product_id()).unwrap_or("?");

        print!(
            "{:>3} x {} [{handle}] @ {}",
            line.quantity(),
            line.product().name,
            line.unit_price(store.currency(), now)?
        );

        if let Some(promotion) = line.promotion().filter(|p| p.is_applicable_at(now)) {
            print!(" ({})", promotion.title);
        }

        println!(" = {}", line.total(store.currency(), now)?);
    }

    println!(
        "\n{} item(s), total {}",
        cart.count(),
        store.cart_total(&cart, now)?
    );

    Ok(())
}
