use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::history::CalculationRecord;

pub fn save_history(records: &[CalculationRecord], path: &Path) -> std::io::Result<()> {
    // Written beside the target, then renamed into place.
    let tmp_path = path.with_extension("gz.tmp");
    let file = File::create(&tmp_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serialize_into(&mut writer, records)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?.flush()?;

    std::fs::rename(&tmp_path, path)
}

pub fn load_history(path: &Path) -> std::io::Result<Vec<CalculationRecord>> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let records: Vec<CalculationRecord> = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(records)
}
