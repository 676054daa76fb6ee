use anyhow::{anyhow, bail, Result};
use skycat_core::{Database, NewObject, ObjectId, ObjectType};

use super::output::print_object;

/// Arguments of `skycat object add`.
pub struct ObjectArgs {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub object_type: String,
    pub magnitude: Option<f64>,
    pub long_name: Option<String>,
}

impl ObjectArgs {
    fn into_object(self) -> Result<NewObject> {
        let object_type: ObjectType = self.object_type.parse().map_err(|e: String| anyhow!(e))?;
        let mut object = NewObject::new(object_type, self.ra, self.dec, self.name);
        if let Some(magnitude) = self.magnitude {
            object = object.with_magnitude(magnitude);
        }
        if let Some(long_name) = self.long_name {
            object = object.with_long_name(long_name);
        }
        Ok(object)
    }
}

pub fn add(db: &Database, catalog_id: i64, args: ObjectArgs) -> Result<()> {
    let object = args.into_object()?;
    let id = db.insert_object(catalog_id, &object)?;
    println!("Added {} to catalog #{catalog_id}: {id}", object.name);
    Ok(())
}

pub fn remove(db: &Database, catalog_id: i64, object_id: &str) -> Result<()> {
    let id: ObjectId = object_id.parse()?;
    db.remove_object(catalog_id, &id)?;
    println!("Removed {id} from catalog #{catalog_id}");
    Ok(())
}

pub fn get(db: &Database, object_id: &str, catalog_id: Option<i64>, json: bool) -> Result<()> {
    let id: ObjectId = object_id.parse()?;
    let object = match catalog_id {
        Some(catalog_id) => db.get_object_in_catalog(&id, catalog_id)?,
        None => db.get_object(&id)?,
    };
    match object {
        Some(object) => print_object(&object, json),
        None => bail!("Object {id} not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(object_type: &str) -> ObjectArgs {
        ObjectArgs {
            name: "M31".to_string(),
            ra: 10.68,
            dec: 41.27,
            object_type: object_type.to_string(),
            magnitude: Some(3.4),
            long_name: Some("Andromeda Galaxy".to_string()),
        }
    }

    #[test]
    fn test_into_object() {
        let object = args("galaxy").into_object().unwrap();
        assert_eq!(object.object_type, ObjectType::Galaxy);
        assert_eq!(object.magnitude, Some(3.4));
        assert_eq!(object.long_name.as_deref(), Some("Andromeda Galaxy"));
    }

    #[test]
    fn test_into_object_rejects_unknown_type() {
        assert!(args("spaceship").into_object().is_err());
    }

    #[test]
    fn test_add_then_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert_object(
                skycat_core::USER_CATALOG_ID,
                &args("galaxy").into_object().unwrap(),
            )
            .unwrap();
        get(&db, &id.to_hex(), None, true).unwrap();
        assert!(get(&db, &"00".repeat(32), None, false).is_err());
        assert!(get(&db, "not-hex", None, false).is_err());
    }
}
