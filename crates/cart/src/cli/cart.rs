use std::io::Write;

use clap::Args;
use rusty_money::iso::Currency;
use storefront_cart::{context::CartContext, domain::products::ProductSnapshot};

use super::{CliError, Commands, render};

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Product identifier
    product_id: String,

    /// Product display name
    #[arg(long, default_value = "")]
    name: String,

    /// List price in minor units
    #[arg(long)]
    price: u64,

    /// Sale price in minor units
    #[arg(long)]
    discount_price: Option<u64>,

    /// Stock ceiling
    #[arg(long)]
    stock: Option<u32>,

    /// Image URL
    #[arg(long)]
    image: Option<String>,

    /// Units to add
    #[arg(long, short, default_value_t = 1)]
    quantity: u32,
}

impl AddArgs {
    fn product(&self) -> ProductSnapshot {
        ProductSnapshot {
            discount_price: self.discount_price,
            stock: self.stock,
            image: self.image.clone(),
            ..ProductSnapshot::new(self.product_id.as_str(), self.name.as_str(), self.price)
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    /// Line identifier
    line_id: String,

    /// New quantity
    #[arg(allow_negative_numbers = true)]
    quantity: i64,
}

#[derive(Debug, Args)]
pub(crate) struct RemoveArgs {
    /// Line identifier
    line_id: String,
}

pub(super) async fn run(
    context: &CartContext,
    command: Commands,
    currency: &'static Currency,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let cart = &context.cart;

    match command {
        Commands::Add(args) => {
            cart.add_to_cart(args.product(), args.quantity).await;
        }
        Commands::Update(args) => {
            cart.update_quantity(args.line_id.into(), args.quantity).await;
        }
        Commands::Remove(args) => {
            cart.remove_from_cart(args.line_id.into()).await;
        }
        Commands::Clear => {
            cart.clear_cart().await;
        }
        Commands::Show | Commands::Login | Commands::Logout => {}
    }

    render::write_cart(out, &cart.snapshot(), currency)?;

    Ok(())
}
