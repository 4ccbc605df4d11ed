use crate::error::{GpkgError, Result};
use std::f64::consts::PI;

pub const EPSG_WORLD_GEODETIC_SYSTEM: u32 = 4326;
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Half the width of the Web Mercator world, in meters.
pub const WEB_MERCATOR_HALF_WORLD_WIDTH: f64 = 20037508.342789244;

/// Latitude at which Web Mercator becomes square.
pub const WEB_MERCATOR_MAX_LAT_RANGE: f64 = 85.0511287798066;
pub const WEB_MERCATOR_MIN_LAT_RANGE: f64 = -85.0511287798066;

const MAX_TILES_PER_SIDE: f64 = i32::MAX as f64;

/// Deepest level [`zoom_level_for_web_mercator`] returns.
pub const MAX_ZOOM_LEVEL: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Apply a transform to the four corners and take their extent.
    pub fn transform(&self, transform: &dyn ProjectionTransform) -> BoundingBox {
        transform.transform_bounding_box(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionUnit {
    Degrees,
    Meters,
    Other,
}

/// Coordinate transform between two projections.
pub trait ProjectionTransform {
    fn transform_point(&self, x: f64, y: f64) -> (f64, f64);

    fn transform_bounding_box(&self, bbox: &BoundingBox) -> BoundingBox {
        let corners = [
            self.transform_point(bbox.min_x, bbox.min_y),
            self.transform_point(bbox.min_x, bbox.max_y),
            self.transform_point(bbox.max_x, bbox.max_y),
            self.transform_point(bbox.max_x, bbox.min_y),
        ];
        let mut out = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            out.min_x = out.min_x.min(x);
            out.min_y = out.min_y.min(y);
            out.max_x = out.max_x.max(x);
            out.max_y = out.max_y.max(y);
        }
        out
    }
}

/// Coordinate reference system of the data behind a DAO.
pub trait Projection {
    fn unit(&self) -> ProjectionUnit;

    /// Transform from this projection to the given EPSG code.
    fn transform_to(&self, epsg: u32) -> Result<Box<dyn ProjectionTransform>>;
}

/// Built-in projection for EPSG:4326 and EPSG:3857.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpsgProjection {
    epsg: u32,
}

impl EpsgProjection {
    pub fn new(epsg: u32) -> Result<Self> {
        match epsg {
            EPSG_WORLD_GEODETIC_SYSTEM | EPSG_WEB_MERCATOR => Ok(Self { epsg }),
            other => Err(GpkgError::Configuration(format!(
                "no built-in projection for EPSG:{other}"
            ))),
        }
    }

    pub fn wgs84() -> Self {
        Self {
            epsg: EPSG_WORLD_GEODETIC_SYSTEM,
        }
    }

    pub fn web_mercator() -> Self {
        Self {
            epsg: EPSG_WEB_MERCATOR,
        }
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }
}

impl Projection for EpsgProjection {
    fn unit(&self) -> ProjectionUnit {
        match self.epsg {
            EPSG_WORLD_GEODETIC_SYSTEM => ProjectionUnit::Degrees,
            _ => ProjectionUnit::Meters,
        }
    }

    fn transform_to(&self, epsg: u32) -> Result<Box<dyn ProjectionTransform>> {
        match (self.epsg, epsg) {
            (from, to) if from == to => Ok(Box::new(Identity)),
            (EPSG_WORLD_GEODETIC_SYSTEM, EPSG_WEB_MERCATOR) => Ok(Box::new(DegreesToMeters)),
            (EPSG_WEB_MERCATOR, EPSG_WORLD_GEODETIC_SYSTEM) => Ok(Box::new(MetersToDegrees)),
            (from, to) => Err(GpkgError::Configuration(format!(
                "no built-in transform from EPSG:{from} to EPSG:{to}"
            ))),
        }
    }
}

struct Identity;

impl ProjectionTransform for Identity {
    fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

struct DegreesToMeters;

impl ProjectionTransform for DegreesToMeters {
    fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let mx = x * WEB_MERCATOR_HALF_WORLD_WIDTH / 180.0;
        let my = ((90.0 + y) * PI / 360.0).tan().ln() / (PI / 180.0);
        (mx, my * WEB_MERCATOR_HALF_WORLD_WIDTH / 180.0)
    }
}

struct MetersToDegrees;

impl ProjectionTransform for MetersToDegrees {
    fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = x / WEB_MERCATOR_HALF_WORLD_WIDTH * 180.0;
        let lat = y / WEB_MERCATOR_HALF_WORLD_WIDTH * 180.0;
        let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
        (lon, lat)
    }
}

/// Clamp the latitudes of a degree bounding box to the Web Mercator range.
pub fn bound_degrees_with_web_mercator_limits(bbox: &BoundingBox) -> BoundingBox {
    BoundingBox {
        min_y: bbox
            .min_y
            .clamp(WEB_MERCATOR_MIN_LAT_RANGE, WEB_MERCATOR_MAX_LAT_RANGE),
        max_y: bbox
            .max_y
            .clamp(WEB_MERCATOR_MIN_LAT_RANGE, WEB_MERCATOR_MAX_LAT_RANGE),
        ..*bbox
    }
}

/// Zoom level at which a Web Mercator bounding box spans about one tile.
///
/// Tiles per side are capped at `i32::MAX`, so tiny or zero-sized extents
/// (a single point) stop at [`MAX_ZOOM_LEVEL`].
pub fn zoom_level_for_web_mercator(bbox: &BoundingBox) -> u32 {
    let world = 2.0 * WEB_MERCATOR_HALF_WORLD_WIDTH;
    let width = positive_extent(bbox.width());
    let height = positive_extent(bbox.height());
    let tiles_per_side = (world / width)
        .min(world / height)
        .clamp(1.0, MAX_TILES_PER_SIDE);
    tiles_per_side.log2().floor() as u32
}

fn positive_extent(extent: f64) -> f64 {
    if extent > 0.0 { extent } else { f64::MIN_POSITIVE }
}
