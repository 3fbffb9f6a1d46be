//! Single-band GeoTIFF elevation tiles.

use std::io::Cursor;

use dem_common::{DemError, DemResult};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

/// GDAL_NODATA (ASCII)
const TAG_GDAL_NODATA: u16 = 42113;

fn decode_err(e: impl std::fmt::Display) -> DemError {
    DemError::DecodeError(format!("invalid GeoTIFF tile: {}", e))
}

/// Decode a single-band TIFF into (width, height, values).
///
/// Samples equal to the file's GDAL_NODATA value decode to `NaN`.
pub fn decode_geotiff(bytes: &[u8]) -> DemResult<(u32, u32, Vec<f32>)> {
    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(decode_err)?;
    let (width, height) = decoder.dimensions().map_err(decode_err)?;

    match decoder.colortype().map_err(decode_err)? {
        ColorType::Gray(_) => {}
        other => {
            return Err(DemError::DecodeError(format!(
                "unsupported GeoTIFF layout {:?}, expected a single band",
                other
            )))
        }
    }

    let nodata: Option<f32> = decoder
        .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok());

    let mut data: Vec<f32> = match decoder.read_image().map_err(decode_err)? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(DemError::DecodeError(
                "unsupported GeoTIFF sample format".to_string(),
            ))
        }
    };

    if data.len() != width as usize * height as usize {
        return Err(DemError::DecodeError(format!(
            "GeoTIFF holds {} samples for {}x{} pixels",
            data.len(),
            width,
            height
        )));
    }

    if let Some(nodata) = nodata {
        for v in data.iter_mut() {
            if *v == nodata {
                *v = f32::NAN;
            }
        }
    }

    Ok((width, height, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_tiff(values: &[f32], width: u32, height: u32, nodata: Option<&str>) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf).unwrap();
            let mut image = encoder
                .new_image::<colortype::Gray32Float>(width, height)
                .unwrap();
            if let Some(nodata) = nodata {
                image
                    .encoder()
                    .write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata)
                    .unwrap();
            }
            image.write_data(values).unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_decode_float_tiff() {
        let values = [1.5f32, -2.0, 300.25, 8848.0];
        let (w, h, data) = decode_geotiff(&write_tiff(&values, 2, 2, None)).unwrap();
        assert_eq!((w, h), (2, 2));
        assert_eq!(data, values);
    }

    #[test]
    fn test_gdal_nodata_honoured() {
        let values = [1.0f32, -9999.0, 3.0, -9999.0];
        let (_, _, data) = decode_geotiff(&write_tiff(&values, 2, 2, Some("-9999"))).unwrap();
        assert_eq!(data[0], 1.0);
        assert!(data[1].is_nan());
        assert!(data[3].is_nan());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            decode_geotiff(b"II*\0garbage"),
            Err(DemError::DecodeError(_))
        ));
    }
}
