//! Product catalog command handlers.

use tabled::Tabled;

use stockline_core::CoreError;
use stockline_core::models::{NewProduct, Product, ProductFilter, ProductStatus, ProductUpdate};

use crate::cli::{
    GlobalOpts, NewProductArgs, ProductUpdateArgs, ProductsArgs, ProductsCommand, StockStatusArg,
};
use crate::error::CliError;
use crate::output;

use super::{Context, entity_payload, payload, util};

impl From<StockStatusArg> for ProductStatus {
    fn from(arg: StockStatusArg) -> Self {
        match arg {
            StockStatusArg::InStock => Self::InStock,
            StockStatusArg::LowStock => Self::LowStock,
            StockStatusArg::OutOfStock => Self::OutOfStock,
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct ProductRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Stock")]
    stock: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ProductRow {
    pub(super) fn new(p: &Product, color: bool) -> Self {
        Self {
            id: p.id.clone(),
            sku: p.sku.clone(),
            name: p.name.clone(),
            category: p.category.clone(),
            price: util::money(p.price),
            stock: format!("{}/{}", p.stock, p.min_stock),
            status: output::paint_status(&p.status.to_string(), color),
        }
    }
}

fn detail(p: &Product) -> String {
    output::detail_lines(&[
        ("ID:", p.id.clone()),
        ("Name:", p.name.clone()),
        ("SKU:", p.sku.clone()),
        ("Category:", p.category.clone()),
        ("Price:", util::money(p.price)),
        ("Stock:", p.stock.to_string()),
        ("Min stock:", p.min_stock.to_string()),
        ("Value:", util::money(p.stock_value())),
        ("Status:", p.status.to_string()),
        ("Location:", output::or_dash(p.location.as_deref())),
        ("Supplier:", output::or_dash(p.supplier.as_deref())),
        ("Description:", output::or_dash(p.description.as_deref())),
        ("Updated:", util::short_time(p.last_updated.as_ref())),
    ])
}

fn new_product(args: NewProductArgs) -> Result<NewProduct, CliError> {
    if args.price < 0.0 {
        return Err(CliError::Validation {
            field: "price".into(),
            reason: "must not be negative".into(),
        });
    }
    Ok(NewProduct {
        name: args.name,
        category: args.category,
        sku: args.sku,
        price: args.price,
        stock: args.stock,
        min_stock: args.min_stock,
        description: args.description,
        location: args.location,
        supplier: args.supplier,
    })
}

fn product_update(args: ProductUpdateArgs) -> Result<ProductUpdate, CliError> {
    let update = ProductUpdate {
        name: args.name,
        category: args.category,
        price: args.price,
        stock: args.stock,
        min_stock: args.min_stock,
        status: args.status.map(Into::into),
        description: args.description,
        location: args.location,
        supplier: args.supplier,
    };
    if update.is_empty() {
        return Err(CliError::Validation {
            field: "update".into(),
            reason: "pass at least one field to change".into(),
        });
    }
    Ok(update)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: ProductsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = ctx.client()?;
    let color = output::should_color(&global.color);

    match args.command {
        ProductsCommand::List(list) => {
            let filter = ProductFilter {
                page: list.paging.page,
                limit: list.paging.limit,
                category: list.category,
                status: list.status.map(Into::into),
                search: list.search,
            };
            let page = payload(client.list_products(&filter).await)?;
            tracing::debug!(total = page.total, page = page.page, "listed products");
            let out = output::render_list(
                &global.output,
                &page.data,
                |p| ProductRow::new(p, color),
                |p| p.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProductsCommand::Get { id } => {
            let product = entity_payload(client.get_product(&id).await, "product", &id)?;
            let out = output::render_single(&global.output, &product, detail, |p| p.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProductsCommand::Create(fields) => {
            let body = new_product(fields)?;
            let product = payload(client.create_product(&body).await)?;
            let out = output::render_single(&global.output, &product, detail, |p| p.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProductsCommand::Update { id, fields } => {
            let body = product_update(fields)?;
            let product =
                entity_payload(client.update_product(&id, &body).await, "product", &id)?;
            let out = output::render_single(&global.output, &product, detail, |p| p.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProductsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete product {id}?"), "products delete", global.yes)? {
                return Ok(());
            }
            // Any successful envelope counts, with or without a body.
            let envelope = client
                .delete_product(&id)
                .await
                .map_err(|e| CoreError::from(e).for_entity("product", &id))?;
            if !envelope.success {
                return Err(CliError::Rejected {
                    message: envelope.failure_message(),
                });
            }
            if !global.quiet {
                eprintln!("Product {id} deleted");
            }
            Ok(())
        }
    }
}
