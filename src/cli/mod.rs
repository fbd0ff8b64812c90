//! One-shot command rendering for the binary

pub mod ui;

use crate::cache::FundCache;
use crate::core::instrument::Instrument;
use anyhow::Result;
use comfy_table::Cell;
use std::sync::Arc;

/// How many trailing NAV rows `nav` prints; full histories run to
/// thousands of days.
const NAV_TAIL_ROWS: usize = 10;

pub fn print_search(cache: &Arc<FundCache>, query: &str) -> Result<()> {
    let results = cache.search(query)?;
    if results.is_empty() {
        println!("No funds match '{query}'");
        return Ok(());
    }

    println!("{}", fund_table(&results));
    Ok(())
}

pub fn print_info(cache: &Arc<FundCache>, scheme_code: u32) -> Result<()> {
    let fund = cache.descriptor(scheme_code)?;
    println!("{}", fund_table(std::slice::from_ref(&fund)));
    Ok(())
}

pub async fn print_nav(cache: &Arc<FundCache>, scheme_code: u32) -> Result<()> {
    let fund = cache.descriptor(scheme_code)?;
    let series = cache.series(scheme_code).await?;

    if series.is_empty() {
        println!("NAV history for '{}' is unavailable right now, try again later", fund.name);
        return Ok(());
    }

    let first = &series[0];
    let last = &series[series.len() - 1];
    println!(
        "{}: {} points from {} to {}",
        fund.name,
        series.len(),
        first.date,
        last.date
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("NAV")]);
    let tail_start = series.len().saturating_sub(NAV_TAIL_ROWS);
    for point in &series[tail_start..] {
        table.add_row(vec![Cell::new(point.date), ui::nav_cell(point.nav)]);
    }
    println!("{table}");
    Ok(())
}

fn fund_table(funds: &[Instrument]) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Fund"),
        ui::header_cell("ISIN"),
    ]);
    for fund in funds {
        table.add_row(vec![
            Cell::new(fund.scheme_code),
            Cell::new(&fund.name),
            Cell::new(fund.isin_growth.as_deref().unwrap_or("N/A")),
        ]);
    }
    table
}
