use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;
use skycat_core::{Catalog, CatalogObject, CatalogStatistics};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}

/// Right ascension in degrees as `HHhMMmSS.Ss`.
pub(crate) fn format_ra(ra: f64) -> String {
    let tenths = (ra / 15.0 * 36_000.0).round() as i64;
    let hours = (tenths / 36_000).rem_euclid(24);
    let minutes = (tenths / 600) % 60;
    let seconds = (tenths % 600) as f64 / 10.0;
    format!("{hours:02}h{minutes:02}m{seconds:04.1}s")
}

/// Declination in degrees as `±DD°MM'SS"`.
pub(crate) fn format_dec(dec: f64) -> String {
    let sign = if dec < 0.0 { '-' } else { '+' };
    let total = (dec.abs() * 3600.0).round() as i64;
    let degrees = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{sign}{degrees:02}°{minutes:02}'{seconds:02}\"")
}

pub(crate) fn format_magnitude(magnitude: Option<f64>) -> String {
    magnitude
        .map(|m| format!("{m:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn print_objects(objects: &[CatalogObject], json: bool) -> Result<()> {
    if json {
        return print_json(objects);
    }
    if objects.is_empty() {
        println!("No objects found.");
        return Ok(());
    }

    let mut table = new_table(&["Name", "Type", "RA", "Dec", "Mag", "Catalog", "Id"]);
    for object in objects {
        table.add_row(vec![
            Cell::new(&object.name),
            Cell::new(object.object_type),
            Cell::new(format_ra(object.ra)),
            Cell::new(format_dec(object.dec)),
            Cell::new(format_magnitude(object.magnitude)).set_alignment(CellAlignment::Right),
            Cell::new(object.catalog_id).set_alignment(CellAlignment::Right),
            Cell::new(object.object_id),
        ]);
    }
    println!("{table}");
    println!("  {} object(s)", objects.len());
    Ok(())
}

pub(crate) fn print_object(object: &CatalogObject, json: bool) -> Result<()> {
    if json {
        return print_json(object);
    }

    println!("{} ({})", object.name, object.object_type);
    println!("{}", "-".repeat(60));
    println!("  Id:          {}", object.object_id);
    println!("  Catalog:     {}", object.catalog_id);
    println!("  RA / Dec:    {} {}", format_ra(object.ra), format_dec(object.dec));
    println!("  Magnitude:   {}", format_magnitude(object.magnitude));
    if let Some(long_name) = &object.long_name {
        println!("  Long name:   {long_name}");
    }
    if let Some(identifier) = &object.catalog_identifier {
        println!("  Identifier:  {identifier}");
    }
    if let (Some(major), Some(minor)) = (object.major_axis, object.minor_axis) {
        println!("  Axes:        {major:.2}' x {minor:.2}'");
    }
    if let Some(angle) = object.position_angle {
        println!("  Pos. angle:  {angle:.1}°");
    }
    if let Some(flux) = object.flux {
        println!("  Flux:        {flux}");
    }
    println!("  Trixel:      {}", object.trixel);
    Ok(())
}

pub(crate) fn print_catalogs(catalogs: &[Catalog], json: bool) -> Result<()> {
    if json {
        return print_json(catalogs);
    }

    let mut table = new_table(&["Id", "Name", "Precedence", "Mutable", "Enabled", "Version", "Author"]);
    for catalog in catalogs {
        let enabled = if catalog.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(catalog.id).set_alignment(CellAlignment::Right),
            Cell::new(&catalog.name),
            Cell::new(format!("{:.2}", catalog.precedence)).set_alignment(CellAlignment::Right),
            Cell::new(if catalog.mutable { "yes" } else { "no" }),
            enabled,
            Cell::new(catalog.version).set_alignment(CellAlignment::Right),
            Cell::new(&catalog.author),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub(crate) fn print_catalog_meta(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        return print_json(catalog);
    }

    println!("Catalog #{} ({})", catalog.id, catalog.name);
    println!("{}", "-".repeat(60));
    println!("  Precedence:   {:.2}", catalog.precedence);
    println!("  Version:      {}", catalog.version);
    println!("  Mutable:      {}", catalog.mutable);
    for (label, value) in [
        ("Author", &catalog.author),
        ("Maintainer", &catalog.maintainer),
        ("Source", &catalog.source),
        ("License", &catalog.license),
        ("Description", &catalog.description),
    ] {
        if !value.is_empty() {
            println!("  {:<13} {value}", format!("{label}:"));
        }
    }
    if let Some(timestamp) = catalog.timestamp {
        println!("  Built:        {}", timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(())
}

pub(crate) fn print_statistics(stats: &CatalogStatistics, json: bool) -> Result<()> {
    if json {
        return print_json(stats);
    }

    let mut table = new_table(&["Type", "Count"]);
    for (object_type, count) in &stats.object_counts {
        table.add_row(vec![
            Cell::new(object_type),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!("  Total: {}", stats.total_count);
    Ok(())
}
