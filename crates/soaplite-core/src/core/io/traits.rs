use crate::core::models::structure::AtomicStructure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing structure file formats.
///
/// A file holds one or more frames; each frame is a complete [`AtomicStructure`].
pub trait StructureFile {
    /// The error type for I/O and parsing operations.
    type Error: Error + From<io::Error>;

    /// Reads every frame from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<AtomicStructure>, Self::Error>;

    /// Writes frames to a writer, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(frames: &[AtomicStructure], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads every frame from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<AtomicStructure>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes frames to a file path, creating or truncating the file.
    fn write_to_path<P: AsRef<Path>>(
        frames: &[AtomicStructure],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frames, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
