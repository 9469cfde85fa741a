use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    ocv::provider::ProviderStatus,
    quantity::voltage::Volts,
    twin::{CellTwin, Estimate},
};

#[must_use]
pub fn build_ocv_table(points: &[(f64, Volts)], status: &ProviderStatus) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec![
        Cell::new("SOC"),
        Cell::new("OCV"),
        Cell::new(format!("{} · {}", status.parameter_set, status.source))
            .add_attribute(Attribute::Dim),
    ]);
    for (soc, ocv) in points {
        table.add_row(vec![
            Cell::new(format!("{:.0}%", soc * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(ocv).set_alignment(CellAlignment::Right).fg(if ocv.0 >= 4.0 {
                Color::Green
            } else if ocv.0 >= 3.4 {
                Color::Reset
            } else {
                Color::Red
            }),
            Cell::new(""),
        ]);
    }
    table
}

#[must_use]
pub fn build_summary_table(twin: &CellTwin, last: Option<&Estimate>) -> Table {
    let health = twin.health_state();
    let status = twin.status();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Samples"),
        Cell::new(twin.samples_processed()).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("OCV model"),
        Cell::new(format!("{} ({})", status.source, status.status)),
    ]);
    table.add_row(vec![
        Cell::new("SOC"),
        Cell::new(format!("{:.1}%", twin.soc() * 100.0)).set_alignment(CellAlignment::Right),
    ]);
    if let Some(estimate) = last {
        table.add_row(vec![
            Cell::new("SOC sigma").add_attribute(Attribute::Dim),
            Cell::new(format!("{:.2}%", estimate.sigma_soc_percent))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("Series resistance"),
            Cell::new(format!("{:.1} mΩ", estimate.r0_mohm)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Coulomb balance").add_attribute(Attribute::Dim),
        Cell::new(twin.balance()).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Full cycles"),
        Cell::new(health.full_cycles).set_alignment(CellAlignment::Right),
    ]);
    for (name, soh) in [
        ("SOH (capacity)", health.soh_capacity),
        ("SOH (resistance)", health.soh_resistance),
        ("SOH (thermal)", health.soh_thermal),
        ("SOH (blended)", health.soh_blended),
    ] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{soh:.1}%")).set_alignment(CellAlignment::Right).fg(soh_color(soh)),
        ]);
    }
    table.add_row(vec![
        Cell::new("RUL"),
        match health.rul_days {
            Some(days) => Cell::new(format!("{days:.0} days")).set_alignment(CellAlignment::Right),
            None => Cell::new("n/a").add_attribute(Attribute::Dim),
        },
    ]);
    table
}

const fn soh_color(soh: f64) -> Color {
    if soh >= 90.0 {
        Color::Green
    } else if soh >= 80.0 {
        Color::DarkYellow
    } else {
        Color::Red
    }
}
