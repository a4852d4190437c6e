//! Stock alert command handler.

use tabled::Tabled;

use stockline_core::models::StockAlert;

use crate::cli::{AlertsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, payload, util};

#[derive(Tabled)]
pub(super) struct AlertRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Stock")]
    stock: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Raised")]
    raised: String,
}

impl AlertRow {
    pub(super) fn new(a: &StockAlert, color: bool) -> Self {
        Self {
            severity: output::paint_status(&a.severity.to_string().to_lowercase(), color),
            product: a.product_name.clone(),
            alert_type: a.alert_type.clone(),
            stock: format!("{}/{}", a.current_stock, a.threshold),
            message: a.message.clone(),
            raised: util::short_time(a.timestamp.as_ref()),
        }
    }
}

pub async fn handle(ctx: &Context, args: &AlertsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client()?;
    let color = output::should_color(&global.color);

    let mut alerts = payload(client.stock_alerts().await)?;
    if args.critical {
        alerts.retain(StockAlert::is_critical);
    }

    let out = output::render_list(
        &global.output,
        &alerts,
        |a| AlertRow::new(a, color),
        |a| a.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
