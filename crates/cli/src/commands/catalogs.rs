use std::path::Path;

use anyhow::{bail, Result};
use skycat_core::{Catalog, Database, StatsScope};

use super::output::{print_catalog_meta, print_catalogs, print_statistics};

/// Arguments of `skycat catalog add`.
pub struct NewCatalog {
    pub id: Option<i64>,
    pub name: String,
    pub precedence: f64,
    pub mutable: bool,
    pub author: String,
    pub description: String,
}

pub fn list(db: &Database, include_disabled: bool, json: bool) -> Result<()> {
    let catalogs = db.catalogs(include_disabled)?;
    print_catalogs(&catalogs, json)
}

pub fn add(db: &Database, args: NewCatalog) -> Result<()> {
    let id = match args.id {
        Some(id) => id,
        None => db.find_suitable_catalog_id()?,
    };

    let mut catalog = Catalog::new(id, args.name)
        .with_precedence(args.precedence)
        .mutable(args.mutable);
    catalog.author = args.author;
    catalog.description = args.description;
    catalog.timestamp = Some(chrono::Utc::now());

    db.register_catalog(&catalog)?;
    println!("Registered catalog #{} ({})", catalog.id, catalog.name);
    Ok(())
}

pub fn remove(db: &Database, id: i64) -> Result<()> {
    let Some(catalog) = db.get_catalog(id)? else {
        bail!("No catalog with id {id}");
    };
    db.remove_catalog(id)?;
    println!("Removed catalog #{} ({})", catalog.id, catalog.name);
    Ok(())
}

pub fn set_enabled(db: &Database, id: i64, enabled: bool) -> Result<()> {
    db.set_catalog_enabled(id, enabled)?;
    let state = if enabled { "Enabled" } else { "Disabled" };
    println!("{state} catalog #{id}");
    Ok(())
}

pub fn stats(db: &Database, id: Option<i64>, json: bool) -> Result<()> {
    let scope = match id {
        Some(id) => StatsScope::Catalog(id),
        None => StatsScope::Master,
    };
    let stats = db.catalog_statistics(scope)?;
    print_statistics(&stats, json)
}

pub fn dump(db: &Database, id: i64, path: &Path) -> Result<()> {
    db.dump_catalog(id, path)?;
    println!("Dumped catalog #{id} to {}", path.display());
    Ok(())
}

pub fn import(db: &Database, path: &Path, overwrite: bool, dry_run: bool, json: bool) -> Result<()> {
    if dry_run {
        let catalog = Database::read_catalog_meta_from_file(path)?;
        return print_catalog_meta(&catalog, json);
    }

    let catalog = db.import_catalog(path, overwrite)?;
    println!(
        "Imported catalog #{} ({}) from {}",
        catalog.id,
        catalog.name,
        path.display()
    );
    Ok(())
}

pub fn copy(db: &Database, src: i64, dst: i64) -> Result<()> {
    let copied = db.copy_objects(src, dst)?;
    println!("Copied {copied} object(s) from catalog #{src} to #{dst}");
    Ok(())
}
