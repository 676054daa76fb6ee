use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use super::sql;
use crate::error::Result;

/// Key of the catalog's base color in a [`CatalogColorMap`].
pub const DEFAULT_SCHEME: &str = "default";

/// `scheme -> color` for one catalog.
pub type CatalogColorMap = BTreeMap<String, String>;
/// `catalog id -> scheme -> color`.
pub type ColorMap = BTreeMap<i64, CatalogColorMap>;

/// Parse `[default color];[scheme];[color];...`. A scheme without a color is
/// ignored, as is an empty default.
pub fn parse_color_string(s: &str) -> CatalogColorMap {
    let mut colors = CatalogColorMap::new();
    let mut parts = s.split(';');

    if let Some(default) = parts.next().filter(|c| !c.is_empty()) {
        colors.insert(DEFAULT_SCHEME.to_string(), default.to_string());
    }

    let rest: Vec<&str> = parts.collect();
    for pair in rest.chunks_exact(2) {
        if !pair[1].is_empty() {
            colors.insert(pair[0].to_string(), pair[1].to_string());
        }
    }
    colors
}

/// Inverse of [`parse_color_string`], up to scheme ordering.
pub fn to_color_string(colors: &CatalogColorMap) -> String {
    let mut out = colors.get(DEFAULT_SCHEME).cloned().unwrap_or_default();
    for (scheme, color) in colors.iter().filter(|(s, _)| s.as_str() != DEFAULT_SCHEME) {
        out.push(';');
        out.push_str(scheme);
        out.push(';');
        out.push_str(color);
    }
    out
}

/// Colors of every catalog: the registry `color` field first, then the
/// per-scheme overrides stored in `catalog_colors`.
pub fn load_all(conn: &Connection) -> Result<ColorMap> {
    let mut map = ColorMap::new();

    let mut stmt = conn.prepare("SELECT id, color FROM catalogs ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (id, color) in rows {
        map.insert(id, parse_color_string(color.as_deref().unwrap_or_default()));
    }

    let mut stmt = conn.prepare(sql::GET_COLORS)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (id, scheme, color) in rows {
        map.entry(id).or_default().insert(scheme, color);
    }

    Ok(map)
}

pub fn load_for(conn: &Connection, id: i64, registry_color: &str) -> Result<CatalogColorMap> {
    let mut colors = parse_color_string(registry_color);
    let mut stmt = conn.prepare(sql::GET_COLORS_FOR)?;
    let rows = stmt
        .query_map(params![id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    colors.extend(rows);
    Ok(colors)
}

pub fn store(conn: &mut Connection, id: i64, colors: &CatalogColorMap) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(sql::UPSERT_COLOR)?;
        for (scheme, color) in colors {
            stmt.execute(params![id, scheme, color])?;
        }
    }
    tx.commit()?;
    Ok(())
}
