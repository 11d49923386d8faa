//! CSV input and output: query centres in, descriptor matrices out.

use crate::error::{CliError, Result};
use nalgebra::Point3;
use soaplite::engine::descriptor::SoapDescriptor;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `x,y,z` rows. Lines starting with `#` are skipped, and a first row that is not
/// numeric is taken as a header.
pub fn read_centers(reader: impl Read) -> anyhow::Result<Vec<Point3<f64>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut points = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let values: std::result::Result<Vec<f64>, _> =
            record.iter().map(str::parse::<f64>).collect();
        let values = match values {
            Ok(values) => values,
            Err(_) if index == 0 => continue,
            Err(e) => anyhow::bail!("row {}: {}", index + 1, e),
        };
        if values.len() != 3 {
            anyhow::bail!(
                "row {}: expected 3 coordinates, found {}",
                index + 1,
                values.len()
            );
        }
        points.push(Point3::new(values[0], values[1], values[2]));
    }
    Ok(points)
}

pub fn read_centers_from_path(path: &Path) -> Result<Vec<Point3<f64>>> {
    let file = std::fs::File::open(path)?;
    let points = read_centers(file).map_err(|source| CliError::FileParsing {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} query centre(s) from {:?}", points.len(), path);
    Ok(points)
}

/// Writes one descriptor row per line, without a header.
pub fn write_descriptor(descriptor: &SoapDescriptor, writer: impl Write) -> csv::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in descriptor.rows() {
        csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_descriptor_to_path(descriptor: &SoapDescriptor, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_descriptor(descriptor, file).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Output path for frame `index` (1-based) out of `total`: the base path itself for a single
/// frame, `stem_index.ext` otherwise.
pub fn frame_output_path(base: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soaplite::core::basis::RadialBasis;
    use soaplite::core::models::atom::Atom;
    use soaplite::core::models::structure::AtomicStructure;
    use soaplite::engine::config::SoapConfig;
    use soaplite::engine::error::SoapError;
    use soaplite::engine::kernel::{KernelInput, SoapKernel};
    use soaplite::workflows::soap::soap_structure;

    struct IndexKernel;

    impl SoapKernel for IndexKernel {
        fn compute(
            &self,
            _: &KernelInput<'_>,
            output: &mut [f64],
        ) -> std::result::Result<(), SoapError> {
            for (i, v) in output.iter_mut().enumerate() {
                *v = i as f64 * 0.5;
            }
            Ok(())
        }
    }

    fn descriptor() -> SoapDescriptor {
        let structure = AtomicStructure::new(vec![
            Atom::new(1, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(1, Point3::new(0.7, 0.0, 0.0)),
        ]);
        let config = SoapConfig {
            n_max: 2,
            l_max: 0,
            ..SoapConfig::default()
        };
        let basis = RadialBasis::new(vec![1.0; 20], vec![1.0; 40]);
        soap_structure(&structure, &basis, &config, &IndexKernel).unwrap()
    }

    #[test]
    fn centers_accept_header_and_comments() {
        let input = "x,y,z\n# origin\n0,0,0\n 1.5, -2 ,3e-1\n";
        let points = read_centers(input.as_bytes()).unwrap();
        assert_eq!(
            points,
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.5, -2.0, 0.3)]
        );
    }

    #[test]
    fn centers_reject_wrong_column_count_and_bad_values() {
        assert!(read_centers("0,0\n".as_bytes()).is_err());
        assert!(read_centers("0,0,0\n1,x,2\n".as_bytes()).is_err());
    }

    #[test]
    fn descriptor_rows_become_csv_lines() {
        let descriptor = descriptor();
        assert_eq!(descriptor.shape(), (2, 3));

        let mut buffer = Vec::new();
        write_descriptor(&descriptor, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "0,0.5,1\n1.5,2,2.5\n");
    }

    #[test]
    fn frame_paths_are_numbered_only_for_batches() {
        let base = Path::new("/tmp/out/desc.csv");
        assert_eq!(frame_output_path(base, 1, 1), PathBuf::from("/tmp/out/desc.csv"));
        assert_eq!(frame_output_path(base, 2, 3), PathBuf::from("/tmp/out/desc_2.csv"));
        assert_eq!(
            frame_output_path(Path::new("desc"), 1, 2),
            PathBuf::from("desc_1")
        );
    }

    #[test]
    fn descriptor_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.csv");
        write_descriptor_to_path(&descriptor(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
