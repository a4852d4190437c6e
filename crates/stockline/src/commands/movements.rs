//! Stock movement command handlers.

use tabled::Tabled;

use stockline_core::models::{MovementFilter, MovementType, NewStockMovement, StockMovement};

use crate::cli::{GlobalOpts, MovementTypeArg, MovementsArgs, MovementsCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, entity_payload, payload, util};

impl From<MovementTypeArg> for MovementType {
    fn from(arg: MovementTypeArg) -> Self {
        match arg {
            MovementTypeArg::In => Self::In,
            MovementTypeArg::Out => Self::Out,
            MovementTypeArg::Adjustment => Self::Adjustment,
            MovementTypeArg::Transfer => Self::Transfer,
        }
    }
}

#[derive(Tabled)]
pub(super) struct MovementRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Qty")]
    quantity: i64,
    #[tabled(rename = "Stock")]
    stock: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&StockMovement> for MovementRow {
    fn from(m: &StockMovement) -> Self {
        let stock = match (m.previous_stock, m.new_stock) {
            (Some(before), Some(after)) => format!("{before} -> {after}"),
            _ => "-".into(),
        };
        Self {
            id: m.id.clone(),
            when: util::short_time(m.timestamp.as_ref()),
            product: m
                .product_name
                .clone()
                .unwrap_or_else(|| m.product_id.clone()),
            kind: m.movement_type.to_string(),
            quantity: m.quantity,
            stock,
            reason: m.reason.clone(),
        }
    }
}

fn detail(m: &StockMovement) -> String {
    output::detail_lines(&[
        ("ID:", m.id.clone()),
        ("Product:", m.product_id.clone()),
        ("Name:", output::or_dash(m.product_name.as_deref())),
        ("Type:", m.movement_type.to_string()),
        ("Quantity:", m.quantity.to_string()),
        (
            "New stock:",
            m.new_stock.map_or_else(|| "-".into(), |s| s.to_string()),
        ),
        ("Reason:", m.reason.clone()),
        ("Location:", output::or_dash(m.location.as_deref())),
        ("Reference:", output::or_dash(m.reference.as_deref())),
        ("Recorded:", util::short_time(m.timestamp.as_ref())),
    ])
}

pub async fn handle(
    ctx: &Context,
    args: MovementsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = ctx.client()?;

    match args.command {
        MovementsCommand::List {
            paging,
            product,
            movement_type,
            since,
            until,
        } => {
            if let (Some(since), Some(until)) = (since, until) {
                if since > until {
                    return Err(CliError::Validation {
                        field: "since".into(),
                        reason: format!("{since} is after {until}"),
                    });
                }
            }
            let filter = MovementFilter {
                product_id: product,
                movement_type: movement_type.map(Into::into),
                start_date: since,
                end_date: until,
                page: paging.page,
                limit: paging.limit,
            };
            let page = payload(client.list_stock_movements(&filter).await)?;
            let out = output::render_list(
                &global.output,
                &page.data,
                |x| MovementRow::from(x),
                |m| m.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MovementsCommand::Record {
            product,
            movement_type,
            quantity,
            reason,
            location,
            reference,
            notes,
        } => {
            let body = NewStockMovement {
                product_id: product.clone(),
                movement_type: movement_type.into(),
                quantity,
                reason,
                location,
                reference,
                notes,
            };
            let movement = entity_payload(
                client.record_stock_movement(&body).await,
                "product",
                &product,
            )?;
            let out =
                output::render_single(&global.output, &movement, detail, |m| m.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
