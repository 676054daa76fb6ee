use sha2::{Digest, Sha256};

use crate::domain::{NewObject, ObjectId};

const FIELD_SEPARATOR: char = '\u{1f}';

/// Render a number with six significant digits so that values which differ
/// only by floating-point representation noise hash identically.
fn canonical_number(value: f64) -> String {
    // -0.0 and 0.0 must agree
    format!("{:.5e}", value + 0.0)
}

fn canonical_optional(value: Option<f64>) -> String {
    value.map(canonical_number).unwrap_or_default()
}

/// The exact byte string fed to the digest. Exposed for tests and debugging.
pub fn canonical_form(object: &NewObject) -> String {
    let fields = [
        object.object_type.code().to_string(),
        canonical_number(object.ra),
        canonical_number(object.dec),
        canonical_optional(object.magnitude),
        canonical_optional(object.major_axis),
        canonical_optional(object.minor_axis),
        canonical_optional(object.position_angle),
        canonical_optional(object.flux),
        object.name.clone(),
        object.long_name.clone().unwrap_or_default(),
        object.catalog_identifier.clone().unwrap_or_default(),
    ];

    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(field);
    }
    out
}

/// Compute the content-addressed id of an object.
///
/// The object is normalized first, so callers may pass raw input.
pub fn object_id(object: &NewObject) -> ObjectId {
    let normalized = object.normalized();
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(&normalized).as_bytes());
    ObjectId(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectType;

    fn star() -> NewObject {
        NewObject::new(ObjectType::Star, 10.0, 20.0, "test")
    }

    #[test]
    fn test_object_id_consistency() {
        let a = object_id(&star());
        let b = object_id(&star());
        assert_eq!(a, b);
    }

    #[test]
    fn test_object_id_pinned() {
        // Guards against accidental changes to the canonical encoding.
        assert_eq!(
            object_id(&star()).to_hex(),
            "69398bf6b8d8139054530be3e2d99394ad18c7ffbf231344079a224e7e7bbb24"
        );
    }

    #[test]
    fn test_canonical_form() {
        let obj = star().with_magnitude(4.5).with_long_name("Test Star");
        assert_eq!(
            canonical_form(&obj),
            "0\u{1f}1.00000e1\u{1f}2.00000e1\u{1f}4.50000e0\u{1f}\u{1f}\u{1f}\u{1f}\u{1f}test\u{1f}Test Star\u{1f}"
        );
    }

    #[test]
    fn test_representation_noise_ignored() {
        let a = NewObject::new(ObjectType::Galaxy, 0.1 + 0.2, -0.0, "n");
        let b = NewObject::new(ObjectType::Galaxy, 0.3, 0.0, "n");
        assert_eq!(object_id(&a), object_id(&b));
    }

    #[test]
    fn test_every_field_matters() {
        let base = star()
            .with_magnitude(5.0)
            .with_long_name("long")
            .with_catalog_identifier("NGC 1")
            .with_axes(1.0, 2.0, 3.0)
            .with_flux(4.0);
        let base_id = object_id(&base);

        let variants = vec![
            NewObject { object_type: ObjectType::Galaxy, ..base.clone() },
            NewObject { ra: 10.5, ..base.clone() },
            NewObject { dec: 20.5, ..base.clone() },
            NewObject { magnitude: Some(6.0), ..base.clone() },
            NewObject { major_axis: Some(1.5), ..base.clone() },
            NewObject { minor_axis: Some(2.5), ..base.clone() },
            NewObject { position_angle: Some(3.5), ..base.clone() },
            NewObject { flux: Some(4.5), ..base.clone() },
            NewObject { name: "other".into(), ..base.clone() },
            NewObject { long_name: None, ..base.clone() },
            NewObject { catalog_identifier: Some("NGC 2".into()), ..base.clone() },
        ];

        for variant in variants {
            assert_ne!(object_id(&variant), base_id, "{variant:?}");
        }
    }

    #[test]
    fn test_fields_do_not_bleed_across_separators() {
        let a = star().with_long_name("ab");
        let b = NewObject { name: "testab".into(), ..star() };
        assert_ne!(object_id(&a), object_id(&b));
    }

    #[test]
    fn test_sentinels_hash_like_missing_values() {
        let with_sentinel = star().with_magnitude(99.0).with_long_name("");
        assert_eq!(object_id(&with_sentinel), object_id(&star()));
    }
}
