use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Id of the always-present, always-mutable user catalog.
pub const USER_CATALOG_ID: i64 = 0;
pub const USER_CATALOG_NAME: &str = "user";
/// Lowest id handed out by [`crate::Database::find_suitable_catalog_id`].
pub const CUSTOM_CATALOG_MIN_ID: i64 = 1000;
/// Magnitudes at or above this value mean "unknown".
pub const UNKNOWN_MAGNITUDE: f64 = 99.0;

/// The kind of sky object. Discriminants are the integer codes stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Star = 0,
    CatalogStar = 1,
    Planet = 2,
    OpenCluster = 3,
    GlobularCluster = 4,
    GaseousNebula = 5,
    PlanetaryNebula = 6,
    SupernovaRemnant = 7,
    Galaxy = 8,
    Comet = 9,
    Asteroid = 10,
    Constellation = 11,
    Moon = 12,
    Asterism = 13,
    GalaxyCluster = 14,
    DarkNebula = 15,
    Quasar = 16,
    MultipleStar = 17,
    RadioSource = 18,
    Satellite = 19,
    Supernova = 20,
    Unknown = 255,
}

impl ObjectType {
    pub const ALL: [ObjectType; 22] = [
        ObjectType::Star,
        ObjectType::CatalogStar,
        ObjectType::Planet,
        ObjectType::OpenCluster,
        ObjectType::GlobularCluster,
        ObjectType::GaseousNebula,
        ObjectType::PlanetaryNebula,
        ObjectType::SupernovaRemnant,
        ObjectType::Galaxy,
        ObjectType::Comet,
        ObjectType::Asteroid,
        ObjectType::Constellation,
        ObjectType::Moon,
        ObjectType::Asterism,
        ObjectType::GalaxyCluster,
        ObjectType::DarkNebula,
        ObjectType::Quasar,
        ObjectType::MultipleStar,
        ObjectType::RadioSource,
        ObjectType::Satellite,
        ObjectType::Supernova,
        ObjectType::Unknown,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Unrecognised codes map to [`ObjectType::Unknown`].
    pub fn from_code(code: i64) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .unwrap_or(ObjectType::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Star => "star",
            ObjectType::CatalogStar => "catalog-star",
            ObjectType::Planet => "planet",
            ObjectType::OpenCluster => "open-cluster",
            ObjectType::GlobularCluster => "globular-cluster",
            ObjectType::GaseousNebula => "gaseous-nebula",
            ObjectType::PlanetaryNebula => "planetary-nebula",
            ObjectType::SupernovaRemnant => "supernova-remnant",
            ObjectType::Galaxy => "galaxy",
            ObjectType::Comet => "comet",
            ObjectType::Asteroid => "asteroid",
            ObjectType::Constellation => "constellation",
            ObjectType::Moon => "moon",
            ObjectType::Asterism => "asterism",
            ObjectType::GalaxyCluster => "galaxy-cluster",
            ObjectType::DarkNebula => "dark-nebula",
            ObjectType::Quasar => "quasar",
            ObjectType::MultipleStar => "multiple-star",
            ObjectType::RadioSource => "radio-source",
            ObjectType::Satellite => "satellite",
            ObjectType::Supernova => "supernova",
            ObjectType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown object type: {s}"))
    }
}

/// Content-addressed object identifier (SHA-256 of the semantic fields).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(ObjectId)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidObjectId(e.to_string()))?;
        ObjectId::from_slice(&bytes)
            .ok_or_else(|| Error::InvalidObjectId(format!("expected 32 bytes, got {}", bytes.len())))
    }
}

/// Registry metadata for one catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: i64,
    pub name: String,
    /// If duplicate objects exist, the copy from the catalog with the highest precedence wins.
    pub precedence: f64,
    pub author: String,
    pub source: String,
    pub description: String,
    pub mutable: bool,
    pub enabled: bool,
    pub version: i64,
    /// Color string of the form `[default color];[scheme];[color]...`.
    pub color: String,
    pub license: String,
    pub maintainer: String,
    /// Build time. `None` means the catalog was not reproducibly built.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Catalog {
    /// A catalog with default metadata, enabled and immutable.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            precedence: 0.0,
            author: String::new(),
            source: String::new(),
            description: String::new(),
            mutable: false,
            enabled: true,
            version: -1,
            color: String::new(),
            license: String::new(),
            maintainer: String::new(),
            timestamp: None,
        }
    }

    pub fn with_precedence(mut self, precedence: f64) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub(crate) fn user() -> Self {
        Catalog::new(USER_CATALOG_ID, USER_CATALOG_NAME)
            .with_precedence(1.0)
            .mutable(true)
            .enabled(true)
    }
}

/// The semantic fields of an object, as supplied by callers on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    pub object_type: ObjectType,
    pub ra: f64,
    pub dec: f64,
    pub magnitude: Option<f64>,
    pub name: String,
    pub long_name: Option<String>,
    pub catalog_identifier: Option<String>,
    pub major_axis: Option<f64>,
    pub minor_axis: Option<f64>,
    pub position_angle: Option<f64>,
    pub flux: Option<f64>,
}

impl NewObject {
    pub fn new(object_type: ObjectType, ra: f64, dec: f64, name: impl Into<String>) -> Self {
        Self {
            object_type,
            ra,
            dec,
            magnitude: None,
            name: name.into(),
            long_name: None,
            catalog_identifier: None,
            major_axis: None,
            minor_axis: None,
            position_angle: None,
            flux: None,
        }
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn with_catalog_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.catalog_identifier = Some(identifier.into());
        self
    }

    pub fn with_axes(mut self, major: f64, minor: f64, position_angle: f64) -> Self {
        self.major_axis = Some(major);
        self.minor_axis = Some(minor);
        self.position_angle = Some(position_angle);
        self
    }

    pub fn with_flux(mut self, flux: f64) -> Self {
        self.flux = Some(flux);
        self
    }

    /// Reject objects without a usable position.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.ra.is_finite() || !self.dec.is_finite() {
            return Err(Error::InvalidObject(format!(
                "{}: position ({}, {}) is not finite",
                self.name, self.ra, self.dec
            )));
        }
        Ok(())
    }

    /// Drop values that carry no information: non-finite numbers, the
    /// unknown-magnitude sentinel and empty optional strings.
    pub fn normalized(&self) -> NewObject {
        fn finite(v: Option<f64>) -> Option<f64> {
            v.filter(|x| x.is_finite())
        }
        fn non_empty(s: &Option<String>) -> Option<String> {
            s.as_ref().filter(|s| !s.is_empty()).cloned()
        }

        NewObject {
            object_type: self.object_type,
            ra: self.ra,
            dec: self.dec,
            magnitude: finite(self.magnitude).filter(|m| *m < UNKNOWN_MAGNITUDE),
            name: self.name.clone(),
            long_name: non_empty(&self.long_name),
            catalog_identifier: non_empty(&self.catalog_identifier),
            major_axis: finite(self.major_axis),
            minor_axis: finite(self.minor_axis),
            position_angle: finite(self.position_angle),
            flux: finite(self.flux),
        }
    }
}

/// One stored object row, owned by exactly one catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub object_id: ObjectId,
    pub object_type: ObjectType,
    pub ra: f64,
    pub dec: f64,
    pub magnitude: Option<f64>,
    pub name: String,
    pub long_name: Option<String>,
    pub catalog_identifier: Option<String>,
    pub major_axis: Option<f64>,
    pub minor_axis: Option<f64>,
    pub position_angle: Option<f64>,
    pub flux: Option<f64>,
    pub trixel: i64,
    pub catalog_id: i64,
}

impl CatalogObject {
    /// The semantic fields of this row, e.g. to insert it into another catalog.
    pub fn to_new_object(&self) -> NewObject {
        NewObject {
            object_type: self.object_type,
            ra: self.ra,
            dec: self.dec,
            magnitude: self.magnitude,
            name: self.name.clone(),
            long_name: self.long_name.clone(),
            catalog_identifier: self.catalog_identifier.clone(),
            major_axis: self.major_axis,
            minor_axis: self.minor_axis,
            position_angle: self.position_angle,
            flux: self.flux,
        }
    }
}

/// Per-type object counts, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub object_counts: BTreeMap<ObjectType, usize>,
    pub total_count: usize,
}

/// What [`crate::Database::catalog_statistics`] counts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    Master,
    Catalog(i64),
}
