use super::ui;
use crate::core::asset::{Asset, AssetId, PriceHistoryEntry};
use crate::core::repository::history_limit;
use crate::store::DiskStore;
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Prints one page of an asset's price history, newest first.
pub fn show(store: &DiskStore, id: u64, limit: Option<usize>, offset: usize) -> Result<()> {
    let asset = store
        .find_asset(AssetId(id))?
        .with_context(|| format!("Asset {id} not found"))?;
    let entries = store.history(asset.id, history_limit(limit), offset)?;
    println!("{}", render_history(&asset, &entries));
    Ok(())
}

pub fn render_history(asset: &Asset, entries: &[PriceHistoryEntry]) -> String {
    let mut output = format!(
        "Price history: {}\n\n",
        ui::style_text(&asset.symbol, ui::StyleType::Title)
    );

    if entries.is_empty() {
        output.push_str(&ui::style_text("No prices recorded", ui::StyleType::Subtle));
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Recorded at"), ui::header_cell("Price")]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::price_cell(entry.price),
        ]);
    }
    output.push_str(&table.to_string());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{HistoryId, NewAsset, UserId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_history() {
        let asset = NewAsset::new(UserId(1), "sol", 1.0, 500.0).into_asset(AssetId(9), Utc::now());
        let entries = vec![PriceHistoryEntry {
            id: HistoryId(1),
            asset_id: asset.id,
            price: 151.25,
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap(),
        }];

        let output = render_history(&asset, &entries);
        assert!(output.contains("SOL"));
        assert!(output.contains("2024-03-02 08:00:00 UTC"));
        assert!(output.contains("$151.25"));

        let empty = render_history(&asset, &[]);
        assert!(empty.contains("No prices recorded"));
    }
}
