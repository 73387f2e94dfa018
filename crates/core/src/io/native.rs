//! Native GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Georeferencing is carried in the ModelPixelScale / ModelTiepoint tags;
//! projections are not interpreted.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, RGB8};
use tiff::encoder::{ImageEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, warn};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the GDAL_NODATA tag so other tools see NaN cells as no-data
    pub write_nodata_tag: bool,
    /// Color written for no-data pixels of RGB images
    pub rgb_nodata_color: [u8; 3],
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            write_nodata_tag: true,
            rgb_nodata_color: [0, 0, 0],
        }
    }
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-sample images decode interleaved; keep the first sample.
    let samples = if rows * cols == 0 { 0 } else { data.len() / (rows * cols) };
    let data = match samples {
        1 => data,
        n if n > 1 && data.len() == rows * cols * n => data.into_iter().step_by(n).collect(),
        _ => {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            })
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    match read_geotransform(&mut decoder) {
        Ok(Some(transform)) => raster.set_transform(transform),
        Ok(None) => debug!("no georeferencing tags, keeping the identity transform"),
        Err(e) => warn!("ignoring georeferencing: {}", e),
    }
    if let Some(nodata) = read_nodata::<T, R>(&mut decoder) {
        raster.set_nodata(Some(nodata));
    }

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let scale = read_f64_tag(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = read_f64_tag(decoder, MODEL_TIEPOINT)?;
    let (scale, tiepoint) = match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => (scale, tiepoint),
        (None, None) => return Ok(None),
        _ => return Err(Error::Other("pixel scale and tiepoint tags must come together".into())),
    };

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::Other(format!(
            "malformed georeferencing: {} scale values, {} tiepoint values",
            scale.len(),
            tiepoint.len()
        )));
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])))
}

fn read_f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    let value = decoder
        .find_tag(Tag::Unknown(tag))
        .map_err(|e| Error::Other(format!("Cannot read tag {}: {}", tag, e)))?;
    value
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(|e| Error::Other(format!("Tag {} is not numeric: {}", tag, e)))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::Unknown(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim().trim_end_matches('\0').parse().ok()?;
    num_traits::cast(value)
}

fn write_geo_tags<W, C, K>(image: &mut ImageEncoder<'_, W, C, K>, transform: &GeoTransform) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    K: TiffKind,
{
    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // Version 1.1.0 with two keys: model type projected, raster type pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    Ok(())
}

/// Write a Raster to a single-band 32-bit float GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, &options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f32::NAN
            } else {
                num_traits::cast(v).unwrap_or(f32::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    write_geo_tags(&mut image, raster.transform())?;

    if options.write_nodata_tag {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), "nan")
            .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

/// Write an RGB image as an 8-bit, three-sample GeoTIFF file
pub fn write_rgb_geotiff<P: AsRef<Path>>(
    image: &RgbImage,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_rgb_geotiff(image, &mut writer, &options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write an RGB image to an in-memory 8-bit GeoTIFF buffer
pub fn write_rgb_geotiff_to_buffer(image: &RgbImage, options: Option<GeoTiffOptions>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_rgb_geotiff(image, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_rgb_geotiff<W: Write + Seek>(image: &RgbImage, writer: W, options: &GeoTiffOptions) -> Result<()> {
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = image.shape();
    let data = image.to_rgb8(options.rgb_nodata_color);

    let mut tiff_image = encoder
        .new_image::<RGB8>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    write_geo_tags(&mut tiff_image, image.red.transform())?;

    tiff_image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_tiff(rows: u32, cols: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
        let data: Vec<f32> = (0..rows * cols).map(|v| v as f32).collect();
        encoder.write_image::<Gray32Float>(cols, rows, &data).unwrap();
        buf
    }

    #[test]
    fn tiff_without_geo_tags_keeps_default_transform() {
        let raster: Raster<f64> = read_geotiff_from_buffer(&plain_tiff(2, 3)).unwrap();
        assert_eq!(raster.shape(), (2, 3));
        assert_eq!(raster.transform(), &GeoTransform::default());
        assert_eq!(raster.get(1, 2).unwrap(), 5.0);
    }

    #[test]
    fn projected_origin_is_recovered() {
        let mut dem = Raster::filled(6, 6, 850.0_f64);
        dem.set_transform(GeoTransform::new(500_000.0, 4_100_180.0, 30.0, -30.0));
        let bytes = write_geotiff_to_buffer(&dem, None).unwrap();

        let mut decoder = Decoder::new(Cursor::new(&bytes)).unwrap();
        let transform = read_geotransform(&mut decoder).unwrap().unwrap();
        assert_eq!(transform, GeoTransform::new(500_000.0, 4_100_180.0, 30.0, -30.0));

        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.transform(), dem.transform());
    }
}
