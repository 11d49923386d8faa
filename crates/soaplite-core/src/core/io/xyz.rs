use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use crate::core::models::element;
use crate::core::models::structure::AtomicStructure;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Unexpected end of file: frame starting on line {frame_line} declares {expected} atoms, found {found}")]
    UnexpectedEof {
        frame_line: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("Missing comment line")]
    MissingComment,
    #[error("Lattice must contain 9 numbers (value: '{0}')")]
    InvalidLattice(String),
    #[error("Invalid pbc value '{0}'; expected three of T/F")]
    InvalidPbc(String),
    #[error("Invalid Properties specification '{0}'")]
    InvalidProperties(String),
    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
    #[error("Atom line has {found} columns, expected at least {expected}")]
    TooFewColumns { expected: usize, found: usize },
}

/// Column layout of the atom lines, derived from the `Properties` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    species: usize,
    position: usize,
    width: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            species: 0,
            position: 1,
            width: 4,
        }
    }
}

impl ColumnLayout {
    fn parse(properties: &str) -> Option<Self> {
        let fields: Vec<&str> = properties.split(':').collect();
        if fields.is_empty() || fields.len() % 3 != 0 {
            return None;
        }
        let mut species = None;
        let mut position = None;
        let mut column = 0;
        for triple in fields.chunks_exact(3) {
            let (name, kind, count) = (triple[0], triple[1], triple[2]);
            let count: usize = count.parse().ok()?;
            match (name.to_ascii_lowercase().as_str(), kind) {
                ("species", "S") if count == 1 => species = Some(column),
                ("pos", "R") if count == 3 => position = Some(column),
                _ => {}
            }
            column += count;
        }
        Some(Self {
            species: species?,
            position: position?,
            width: column,
        })
    }

    /// Every declared column must be present on each atom line.
    fn required_columns(&self) -> usize {
        self.width
    }
}

/// Splits an extended-XYZ comment line into `key=value` pairs.
///
/// Values may be wrapped in double quotes to contain spaces. Bare keys get the value `"T"`.
fn parse_comment(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        let mut value = String::from("T");
        if chars.peek() == Some(&'=') {
            chars.next();
            value.clear();
            if chars.peek() == Some(&'"') {
                chars.next();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    value.push(c);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }
    pairs
}

fn parse_pbc(value: &str) -> Option<[bool; 3]> {
    let flags: Vec<bool> = value
        .split_whitespace()
        .map(|t| match t {
            "T" | "t" | "True" | "true" | "1" => Some(true),
            "F" | "f" | "False" | "false" | "0" => Some(false),
            _ => None,
        })
        .collect::<Option<_>>()?;
    match flags.as_slice() {
        [flag] => Some([*flag; 3]),
        [a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct FrameHeader {
    cell: Option<Cell>,
    pbc: Option<[bool; 3]>,
    layout: ColumnLayout,
}

fn parse_header(comment: &str, line: usize) -> Result<FrameHeader, XyzError> {
    let mut header = FrameHeader::default();
    for (key, value) in parse_comment(comment) {
        match key.to_ascii_lowercase().as_str() {
            "lattice" => {
                let numbers: Vec<f64> = value
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<_, _>>()
                    .map_err(|_| XyzError::Parse {
                        line,
                        kind: XyzParseErrorKind::InvalidLattice(value.clone()),
                    })?;
                let flat: [f64; 9] = numbers.try_into().map_err(|_| XyzError::Parse {
                    line,
                    kind: XyzParseErrorKind::InvalidLattice(value.clone()),
                })?;
                header.cell = Some(Cell::from_flat(&flat));
            }
            "pbc" => {
                header.pbc = Some(parse_pbc(&value).ok_or_else(|| XyzError::Parse {
                    line,
                    kind: XyzParseErrorKind::InvalidPbc(value.clone()),
                })?);
            }
            "properties" => {
                header.layout = ColumnLayout::parse(&value).ok_or_else(|| XyzError::Parse {
                    line,
                    kind: XyzParseErrorKind::InvalidProperties(value.clone()),
                })?;
            }
            _ => {}
        }
    }
    Ok(header)
}

fn parse_atom(line: &str, line_num: usize, layout: &ColumnLayout) -> Result<Atom, XyzError> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    let required = layout.required_columns();
    if columns.len() < required {
        return Err(XyzError::Parse {
            line: line_num,
            kind: XyzParseErrorKind::TooFewColumns {
                expected: required,
                found: columns.len(),
            },
        });
    }

    let species_token = columns[layout.species];
    let atomic_number = element::parse_species(species_token).ok_or_else(|| XyzError::Parse {
        line: line_num,
        kind: XyzParseErrorKind::UnknownSpecies(species_token.to_string()),
    })?;

    let mut xyz = [0.0; 3];
    for (k, slot) in xyz.iter_mut().enumerate() {
        let token = columns[layout.position + k];
        *slot = token.parse().map_err(|_| XyzError::Parse {
            line: line_num,
            kind: XyzParseErrorKind::InvalidFloat(token.to_string()),
        })?;
    }
    Ok(Atom::new(atomic_number, Point3::new(xyz[0], xyz[1], xyz[2])))
}

/// Extended-XYZ structure files.
///
/// Supports the `Lattice`, `pbc` and `Properties` keys of the comment line. A frame is
/// periodic when it has a lattice and `pbc` is absent or not all false.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<AtomicStructure>, Self::Error> {
        let mut frames = Vec::new();
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));

        while let Some((count_line, line)) = lines.next() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let expected: usize = trimmed.parse().map_err(|_| XyzError::Parse {
                line: count_line,
                kind: XyzParseErrorKind::InvalidAtomCount(trimmed.to_string()),
            })?;

            let (comment_line, comment) = match lines.next() {
                Some((n, l)) => (n, l?),
                None => {
                    return Err(XyzError::Parse {
                        line: count_line + 1,
                        kind: XyzParseErrorKind::MissingComment,
                    });
                }
            };
            let header = parse_header(&comment, comment_line)?;

            let mut structure = AtomicStructure::default();
            for found in 0..expected {
                let (line_num, atom_line) = match lines.next() {
                    Some((n, l)) => (n, l?),
                    None => {
                        return Err(XyzError::UnexpectedEof {
                            frame_line: count_line,
                            expected,
                            found,
                        });
                    }
                };
                structure.push(parse_atom(&atom_line, line_num, &header.layout)?);
            }

            let cell = match (header.cell, header.pbc) {
                (Some(_), Some([false, false, false])) => None,
                (Some(cell), Some(pbc)) => {
                    if pbc.iter().any(|p| !p) {
                        warn!(
                            "Frame on line {} has partial periodicity {:?}; treating it as fully periodic.",
                            count_line, pbc
                        );
                    }
                    Some(cell)
                }
                (Some(cell), None) => Some(cell),
                (None, Some(pbc)) => {
                    if pbc.iter().any(|p| *p) {
                        warn!(
                            "Frame on line {} sets pbc without a Lattice; treating it as non-periodic.",
                            count_line
                        );
                    }
                    None
                }
                (None, None) => None,
            };
            frames.push(structure.with_cell(cell));
        }

        debug!("Read {} frame(s) of extended XYZ.", frames.len());
        Ok(frames)
    }

    fn write_to(frames: &[AtomicStructure], writer: &mut impl Write) -> Result<(), Self::Error> {
        for frame in frames {
            writeln!(writer, "{}", frame.len())?;
            match frame.cell() {
                Some(cell) => {
                    let lattice: Vec<String> =
                        cell.to_flat().iter().map(|v| format!("{:.8}", v)).collect();
                    writeln!(
                        writer,
                        "Lattice=\"{}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\"",
                        lattice.join(" ")
                    )?;
                }
                None => writeln!(writer, "Properties=species:S:1:pos:R:3 pbc=\"F F F\"")?,
            }
            for atom in frame.atoms() {
                let p = atom.position;
                match atom.symbol() {
                    Some(symbol) => writeln!(
                        writer,
                        "{:<3} {:>16.8} {:>16.8} {:>16.8}",
                        symbol, p.x, p.y, p.z
                    )?,
                    None => writeln!(
                        writer,
                        "{:<3} {:>16.8} {:>16.8} {:>16.8}",
                        atom.atomic_number, p.x, p.y, p.z
                    )?,
                }
            }
        }
        Ok(())
    }
}
