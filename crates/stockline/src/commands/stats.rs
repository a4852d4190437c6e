//! Inventory statistics command handler.

use stockline_core::models::InventoryStats;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Context, payload, util};

pub(super) fn detail(s: &InventoryStats) -> String {
    let mut lines = vec![
        format!("Products:      {}", s.total_products),
        format!("Stock value:   {}", util::money(s.total_value)),
        format!("Low stock:     {}", s.low_stock_count),
        format!("Out of stock:  {}", s.out_of_stock_count),
    ];
    if !s.top_products.is_empty() {
        lines.push(String::new());
        lines.push("Top products:".into());
        for p in &s.top_products {
            lines.push(format!(
                "  {:<12} {:<32} {:>6}",
                p.sku,
                p.name,
                p.stock
            ));
        }
    }
    lines.join("\n")
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client()?;
    let stats = payload(client.inventory_stats().await)?;
    let out = output::render_single(&global.output, &stats, detail, |s| {
        s.total_products.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
