use crate::error::{GpkgError, Result};
use geo_traits::GeometryTrait;
use wkb::reader::Wkb;

// magic (2) + version (1) + flags (1) + srs_id (4)
const HEADER_LEN: usize = 8;

/// Strip the GeoPackage binary header and envelope to access the raw WKB.
// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub fn gpkg_geometry_to_wkb(b: &[u8]) -> Result<Wkb<'_>> {
    if b.len() < HEADER_LEN {
        return Err(GpkgError::InvalidGpkgGeometryLength {
            len: b.len(),
            minimum: HEADER_LEN,
        });
    }
    let flags = b[3];
    let envelope_size: usize = match flags & 0b00001110 {
        0b00000000 => 0,  // no envelope
        0b00000010 => 32, // [minx, maxx, miny, maxy]
        0b00000100 => 48, // [minx, maxx, miny, maxy, minz, maxz]
        0b00000110 => 48, // [minx, maxx, miny, maxy, minm, maxm]
        0b00001000 => 64, // [minx, maxx, miny, maxy, minz, maxz, minm, maxm]
        _ => {
            return Err(GpkgError::InvalidGpkgGeometryFlags(flags));
        }
    };
    let offset = HEADER_LEN + envelope_size;
    if b.len() < offset {
        return Err(GpkgError::InvalidGpkgGeometryEnvelope {
            len: b.len(),
            required: offset,
        });
    }

    Ok(Wkb::try_new(&b[offset..])?)
}

/// Prefix WKB with a GeoPackage header (little endian SRS id, no envelope).
// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub fn wkb_to_gpkg_geometry(wkb: Wkb<'_>, srs_id: u32) -> Result<Vec<u8>> {
    let mut geom = Vec::with_capacity(wkb.buf().len() + HEADER_LEN);
    geom.extend_from_slice(&[
        0x47u8, // magic
        0x50u8, // magic
        0x00u8, // version
        0x01u8, // flags
    ]);
    geom.extend_from_slice(&srs_id.to_le_bytes());
    geom.extend_from_slice(wkb.buf());

    Ok(geom)
}

/// Encode any `geo-traits` geometry as a GeoPackage geometry blob.
pub fn gpkg_geometry_from<G: GeometryTrait<T = f64>>(geometry: &G, srs_id: u32) -> Result<Vec<u8>> {
    let mut wkb = Vec::new();
    wkb::writer::write_geometry(&mut wkb, geometry, &Default::default())?;
    let wkb = Wkb::try_new(&wkb)?;
    wkb_to_gpkg_geometry(wkb, srs_id)
}
