use anyhow::{anyhow, Result};
use skycat_core::{Database, ObjectType};

use super::output::print_objects;

pub fn find(
    db: &Database,
    name: &str,
    exact: bool,
    catalog: Option<i64>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let objects = match catalog {
        Some(catalog_id) => db.find_objects_by_name_in_catalog(catalog_id, name, limit)?,
        None => db.find_objects_by_name(name, limit, exact)?,
    };
    print_objects(&objects, json)
}

pub fn wildcard(db: &Database, pattern: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let objects = db.find_objects_by_wildcard(pattern, limit)?;
    print_objects(&objects, json)
}

pub fn trixel(db: &Database, trixel: i64, json: bool) -> Result<()> {
    let objects = db.objects_in_trixel(trixel)?;
    print_objects(&objects, json)
}

pub fn bright(
    db: &Database,
    object_type: Option<&str>,
    maglim: Option<f64>,
    limit: usize,
    catalog: Option<i64>,
    json: bool,
) -> Result<()> {
    let object_type = object_type
        .map(|t| t.parse::<ObjectType>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let objects = match (catalog, object_type) {
        (Some(catalog_id), object_type) => {
            db.objects_in_catalog(catalog_id, object_type, maglim, Some(limit))?
        }
        (None, Some(object_type)) => db.objects_by_type(object_type, maglim, Some(limit))?,
        (None, None) => db.objects_by_magnitude(maglim, Some(limit))?,
    };
    print_objects(&objects, json)
}
