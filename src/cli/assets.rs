use super::ui;
use crate::core::asset::{Asset, AssetId, NewAsset, UserId};
use crate::store::DiskStore;
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Starts tracking a symbol for `owner`.
pub fn add(store: &DiskStore, owner: u64, symbol: &str, min: f64, max: f64) -> Result<Asset> {
    let asset = store.create_asset(NewAsset::new(UserId(owner), symbol, min, max))?;
    println!(
        "Tracking {} as asset {}",
        ui::style_text(&asset.symbol, ui::StyleType::Success),
        asset.id
    );
    Ok(asset)
}

pub fn list(store: &DiskStore, include_inactive: bool) -> Result<()> {
    let assets = store.list_assets(include_inactive)?;
    if assets.is_empty() {
        println!(
            "{}",
            ui::style_text("No assets tracked yet", ui::StyleType::Subtle)
        );
        return Ok(());
    }
    println!("{}", render_assets(&assets));
    Ok(())
}

/// Soft-deletes (`active == false`) or restores an asset. History is kept
/// either way.
pub fn set_active(store: &DiskStore, id: u64, active: bool) -> Result<Asset> {
    let Some(asset) = store.set_active(AssetId(id), active)? else {
        bail!("Asset {id} not found");
    };
    let verb = if active { "Restored" } else { "Stopped tracking" };
    println!("{verb} {} (asset {})", asset.symbol, asset.id);
    Ok(asset)
}

pub fn render_assets(assets: &[Asset]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Symbol"),
        ui::header_cell("Owner"),
        ui::header_cell("Last price"),
        ui::header_cell("Alert range"),
        ui::header_cell("Status"),
    ]);

    for asset in assets {
        table.add_row(vec![
            Cell::new(asset.id),
            Cell::new(&asset.symbol),
            Cell::new(asset.owner),
            ui::format_optional_cell(asset.last_price, ui::format_price),
            Cell::new(format!(
                "{} - {}",
                ui::format_price(asset.min_price),
                ui::format_price(asset.max_price)
            )),
            ui::status_cell(asset.active),
        ]);
    }

    table.to_string()
}
