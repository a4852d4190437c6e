//! Analytics report handlers: velocity, costs, suppliers, trends.

use tabled::Tabled;

use stockline_core::models::{
    CostAnalysis, CostFilter, StockVelocity, SupplierPerformance, TrendFilter, TrendMetric,
    TrendPeriod, TrendPoint, VelocityFilter, VelocityPeriod,
};

use crate::cli::{
    AnalyticsArgs, AnalyticsCommand, GlobalOpts, TrendMetricArg, TrendPeriodArg,
    VelocityPeriodArg,
};
use crate::error::CliError;
use crate::output;

use super::{Context, payload, util};

impl From<VelocityPeriodArg> for VelocityPeriod {
    fn from(arg: VelocityPeriodArg) -> Self {
        match arg {
            VelocityPeriodArg::Week => Self::Week,
            VelocityPeriodArg::Month => Self::Month,
            VelocityPeriodArg::Quarter => Self::Quarter,
        }
    }
}

impl From<TrendMetricArg> for TrendMetric {
    fn from(arg: TrendMetricArg) -> Self {
        match arg {
            TrendMetricArg::Sales => Self::Sales,
            TrendMetricArg::Stock => Self::Stock,
            TrendMetricArg::Velocity => Self::Velocity,
        }
    }
}

impl From<TrendPeriodArg> for TrendPeriod {
    fn from(arg: TrendPeriodArg) -> Self {
        match arg {
            TrendPeriodArg::Daily => Self::Daily,
            TrendPeriodArg::Weekly => Self::Weekly,
            TrendPeriodArg::Monthly => Self::Monthly,
        }
    }
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct VelocityRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Velocity")]
    velocity: String,
    #[tabled(rename = "Daily")]
    daily: String,
    #[tabled(rename = "Weekly")]
    weekly: String,
    #[tabled(rename = "Days of supply")]
    days_of_supply: String,
    #[tabled(rename = "Reorder at")]
    reorder_point: u32,
}

impl From<&StockVelocity> for VelocityRow {
    fn from(v: &StockVelocity) -> Self {
        Self {
            product: v.product_name.clone(),
            velocity: v.velocity.to_string(),
            daily: format!("{:.1}", v.average_daily_usage),
            weekly: format!("{:.1}", v.average_weekly_usage),
            days_of_supply: format!("{:.0}", v.days_of_supply),
            reorder_point: v.reorder_point,
        }
    }
}

#[derive(Tabled)]
struct CostRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Total cost")]
    total_cost: String,
    #[tabled(rename = "Value")]
    current_value: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Margin %")]
    margin: String,
    #[tabled(rename = "Turnover")]
    turnover: String,
}

impl From<&CostAnalysis> for CostRow {
    fn from(c: &CostAnalysis) -> Self {
        Self {
            product: c.product_name.clone(),
            total_cost: util::money(c.total_cost),
            current_value: util::money(c.current_value),
            profit: util::money(c.profit),
            margin: format!("{:.1}", c.profit_margin),
            turnover: format!("{:.2}", c.turnover_rate),
        }
    }
}

#[derive(Tabled)]
struct SupplierRow {
    #[tabled(rename = "Supplier")]
    name: String,
    #[tabled(rename = "Orders")]
    orders: u32,
    #[tabled(rename = "On time %")]
    on_time: String,
    #[tabled(rename = "Lead time (d)")]
    lead_time: String,
    #[tabled(rename = "Quality")]
    quality: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&SupplierPerformance> for SupplierRow {
    fn from(s: &SupplierPerformance) -> Self {
        Self {
            name: s.supplier_name.clone(),
            orders: s.total_orders,
            on_time: format!("{:.1}", s.on_time_percentage),
            lead_time: format!("{:.1}", s.average_lead_time),
            quality: format!("{:.1}", s.quality_rating),
            value: util::money(s.total_value),
        }
    }
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&TrendPoint> for TrendRow {
    fn from(t: &TrendPoint) -> Self {
        Self {
            date: t.date.clone(),
            value: format!("{:.2}", t.value),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: AnalyticsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = ctx.client()?;

    let out = match args.command {
        AnalyticsCommand::Velocity { period, products } => {
            let filter = VelocityFilter {
                period: period.map(Into::into),
                product_ids: products,
            };
            let rows = payload(client.velocity_analysis(&filter).await)?;
            output::render_list(&global.output, &rows, |x| VelocityRow::from(x), |v| {
                v.product_id.clone()
            })?
        }

        AnalyticsCommand::Costs {
            since,
            until,
            products,
        } => {
            let filter = CostFilter {
                start_date: since,
                end_date: until,
                product_ids: products,
            };
            let rows = payload(client.cost_analysis(&filter).await)?;
            output::render_list(&global.output, &rows, |x| CostRow::from(x), |c| {
                c.product_id.clone()
            })?
        }

        AnalyticsCommand::Suppliers => {
            let rows = payload(client.supplier_performance().await)?;
            output::render_list(&global.output, &rows, |x| SupplierRow::from(x), |s| {
                s.supplier_id.clone()
            })?
        }

        AnalyticsCommand::Trends {
            metric,
            period,
            since,
            until,
        } => {
            let filter = TrendFilter {
                metric: metric.into(),
                period: period.into(),
                start_date: since,
                end_date: until,
            };
            let points = payload(client.trends(&filter).await)?;
            output::render_list(&global.output, &points, |x| TrendRow::from(x), |t| {
                format!("{}\t{}", t.date, t.value)
            })?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
