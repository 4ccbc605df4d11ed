use crate::error::Result;
use crate::geometry::gpkg_geometry_to_wkb;
use crate::projection::BoundingBox;
use geo_traits::{
    CoordTrait, GeometryCollectionTrait, GeometryTrait, GeometryType, LineStringTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait,
};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Error};

type EnvelopeSide = fn(&BoundingBox) -> f64;

const ENVELOPE_SIDES: [(&str, EnvelopeSide); 4] = [
    ("ST_MinX", |b| b.min_x),
    ("ST_MinY", |b| b.min_y),
    ("ST_MaxX", |b| b.max_x),
    ("ST_MaxY", |b| b.max_y),
];

/// Register the `ST_MinX`, `ST_MaxX`, `ST_MinY`, `ST_MaxY` and `ST_IsEmpty`
/// functions used by feature bounding boxes and the R-tree triggers.
///
/// [`Gpkg`](crate::Gpkg) registers them on every connection it opens; this is
/// only needed for connections created elsewhere.
///
/// ```no_run
/// use rusqlite::Connection;
/// use rusqlite_gpkg_dao::register_spatial_functions;
///
/// let conn = Connection::open("data.gpkg")?;
/// register_spatial_functions(&conn)?;
/// # Ok::<(), rusqlite_gpkg_dao::GpkgError>(())
/// ```
pub fn register_spatial_functions(conn: &Connection) -> Result<()> {
    for (name, side) in ENVELOPE_SIDES {
        conn.create_scalar_function(name, 1, FunctionFlags::SQLITE_DETERMINISTIC, move |ctx| {
            Ok(blob_envelope(ctx)?.flatten().map(|b| side(&b)))
        })?;
    }
    conn.create_scalar_function("ST_IsEmpty", 1, FunctionFlags::SQLITE_DETERMINISTIC, |ctx| {
        Ok(blob_envelope(ctx)?.map(|envelope| i64::from(envelope.is_none())))
    })?;
    Ok(())
}

/// Envelope of the geometry blob in the first argument. The outer `None` is a
/// NULL argument, the inner one an empty geometry.
fn blob_envelope(ctx: &Context<'_>) -> std::result::Result<Option<Option<BoundingBox>>, Error> {
    match ctx.get_raw(0) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => {
            let wkb =
                gpkg_geometry_to_wkb(blob).map_err(|e| Error::UserFunctionError(Box::new(e)))?;
            Ok(Some(envelope(&wkb)))
        }
        _ => Err(Error::InvalidFunctionParameterType(0, Type::Blob)),
    }
}

/// Smallest box covering every coordinate of a geometry, `None` when it has
/// none.
pub(crate) fn envelope<G: GeometryTrait<T = f64>>(geom: &G) -> Option<BoundingBox> {
    let mut extent = None;
    extend_with_geometry(&mut extent, geom);
    extent
}

fn extend_with_geometry<G: GeometryTrait<T = f64>>(extent: &mut Option<BoundingBox>, geom: &G) {
    match geom.as_type() {
        GeometryType::Point(p) => extend_with_point(extent, p),
        GeometryType::LineString(l) => extend_with_line(extent, l),
        GeometryType::Polygon(p) => extend_with_polygon(extent, p),
        GeometryType::MultiPoint(m) => m.points().for_each(|p| extend_with_point(extent, &p)),
        GeometryType::MultiLineString(m) => {
            m.line_strings().for_each(|l| extend_with_line(extent, &l))
        }
        GeometryType::MultiPolygon(m) => m.polygons().for_each(|p| extend_with_polygon(extent, &p)),
        GeometryType::GeometryCollection(c) => {
            c.geometries().for_each(|g| extend_with_geometry(extent, &g))
        }
        // WKB has no encoding for these
        GeometryType::Rect(_) | GeometryType::Triangle(_) | GeometryType::Line(_) => {}
    }
}

fn extend_with_point<P: PointTrait<T = f64>>(extent: &mut Option<BoundingBox>, point: &P) {
    if let Some(coord) = point.coord() {
        extend_with_coord(extent, &coord);
    }
}

fn extend_with_line<L: LineStringTrait<T = f64>>(extent: &mut Option<BoundingBox>, line: &L) {
    line.coords().for_each(|c| extend_with_coord(extent, &c));
}

fn extend_with_polygon<P: PolygonTrait<T = f64>>(extent: &mut Option<BoundingBox>, polygon: &P) {
    // interior rings lie inside the exterior one
    if let Some(ring) = polygon.exterior() {
        extend_with_line(extent, &ring);
    }
}

fn extend_with_coord<C: CoordTrait<T = f64>>(extent: &mut Option<BoundingBox>, coord: &C) {
    let (x, y) = coord.x_y();
    let b = extent.get_or_insert(BoundingBox::new(x, y, x, y));
    b.min_x = b.min_x.min(x);
    b.min_y = b.min_y.min(y);
    b.max_x = b.max_x.max(x);
    b.max_y = b.max_y.max(y);
}
