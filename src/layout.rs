//! Element layout planning.
//!
//! Before any element is decoded, the planner locates every element's data in
//! the stream. Elements whose list properties all have a known length get a
//! closed form layout; the others are scanned once to learn their size.

use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::debug;

use crate::de::val_reader::{decode_scalar, to_count, AsciiValReader, ScalarReader};
use crate::{Descriptor, ElementDef, PlyError, PlyFormat, PlyHeader};

/// Position of one property inside a record, relative to the record source
/// of a [`ScalarReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PropertyCursor {
    /// Position of the count prefix, for list properties.
    pub count_pos: Option<usize>,
    pub data_pos: usize,
    /// Number of payload values; 1 for regular properties.
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PropertyTotals {
    /// Number of payload values across all records.
    pub count: usize,
    /// Encoded size across all records, count prefixes included.
    pub byte_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementLayout {
    /// Stream offset of the first record.
    pub anchor: u64,
    /// Length of the element's data in the stream.
    pub byte_len: usize,
    /// Known item count per property. Regular properties always have 1.
    pub hints: Vec<Option<usize>>,
    pub totals: Vec<PropertyTotals>,
}

impl ElementLayout {
    pub fn is_fixed(&self) -> bool {
        self.hints.iter().all(Option::is_some)
    }

    /// Number of values the given properties hold across the element.
    pub fn total_values(&self, properties: &[usize]) -> usize {
        properties
            .iter()
            .fold(0, |sum: usize, &p| sum.saturating_add(self.totals[p].count))
    }
}

/// Resolves every descriptor against the header and collects the known list
/// lengths per element and property.
///
/// Regular properties count as lists of exactly one item. List properties take
/// the hint of the last descriptor requesting them, a zero hint leaving the
/// length unknown.
pub(crate) fn sync_hints(
    header: &PlyHeader,
    descriptors: &[Descriptor],
) -> Result<Vec<Vec<Option<usize>>>, PlyError> {
    let mut hints: Vec<Vec<Option<usize>>> = header
        .elements
        .iter()
        .map(|element| {
            element
                .properties
                .iter()
                .map(|p| if p.is_list() { None } else { Some(1) })
                .collect()
        })
        .collect();

    for desc in descriptors {
        let (element_idx, property_idxs) = resolve(header, desc)?;
        let element = &header.elements[element_idx];
        for property_idx in property_idxs {
            if element.properties[property_idx].is_list() {
                hints[element_idx][property_idx] = desc.hint();
            }
        }
    }

    Ok(hints)
}

/// Element index and property indices, in descriptor order, named by `desc`.
pub(crate) fn resolve(
    header: &PlyHeader,
    desc: &Descriptor,
) -> Result<(usize, Vec<usize>), PlyError> {
    let element_idx = header
        .element_index(&desc.element_name)
        .ok_or_else(|| PlyError::ElementNotFound(desc.element_name.clone()))?;
    let element = &header.elements[element_idx];
    let property_idxs = desc
        .property_names
        .iter()
        .map(|name| {
            element
                .property_index(name)
                .ok_or_else(|| PlyError::PropertyNotFound {
                    element: element.name.clone(),
                    property: name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((element_idx, property_idxs))
}

/// Plans the layout of every element up to the last one a descriptor names.
///
/// Elements after that are left unplanned (`None`). The reader is left at an
/// unspecified position.
pub(crate) fn plan<S: Read + Seek>(
    reader: &mut BufReader<S>,
    header: &PlyHeader,
    data_start: u64,
    descriptors: &[Descriptor],
) -> Result<Vec<Option<ElementLayout>>, PlyError> {
    let hints = sync_hints(header, descriptors)?;
    let last_requested = descriptors
        .iter()
        .filter_map(|desc| header.element_index(&desc.element_name))
        .max();

    let mut layouts = vec![None; header.elements.len()];
    let Some(last_requested) = last_requested else {
        return Ok(layouts);
    };

    let mut anchor = data_start;
    for (idx, (element, hints)) in header
        .elements
        .iter()
        .zip(hints)
        .enumerate()
        .take(last_requested + 1)
    {
        let fixed = hints.iter().all(Option::is_some);
        let (byte_len, totals) = match (header.format, fixed) {
            (PlyFormat::Ascii, _) => {
                reader.seek(SeekFrom::Start(anchor))?;
                scan_ascii(reader, element, &hints, fixed)?
            }
            (_, true) => {
                let totals = fixed_totals(element, &hints)
                    .ok_or_else(|| PlyError::BinaryParse(element.name.clone()))?;
                let byte_len = totals
                    .iter()
                    .try_fold(0usize, |sum, t| sum.checked_add(t.byte_size))
                    .ok_or_else(|| PlyError::BinaryParse(element.name.clone()))?;
                (byte_len, totals)
            }
            (PlyFormat::BinaryLittleEndian, false) => {
                reader.seek(SeekFrom::Start(anchor))?;
                scan_binary::<LittleEndian, S>(reader, element)?
            }
            (PlyFormat::BinaryBigEndian, false) => {
                reader.seek(SeekFrom::Start(anchor))?;
                scan_binary::<BigEndian, S>(reader, element)?
            }
        };
        debug!(
            "element '{}': {} records, {} bytes at offset {} ({} layout)",
            element.name,
            element.count,
            byte_len,
            anchor,
            if fixed { "fixed" } else { "discovered" }
        );

        let layout = ElementLayout {
            anchor,
            byte_len,
            hints,
            totals,
        };
        anchor = anchor
            .checked_add(byte_len as u64)
            .ok_or_else(|| PlyError::BinaryParse(element.name.clone()))?;
        layouts[idx] = Some(layout);
    }

    Ok(layouts)
}

/// Closed form totals of a fixed layout, `None` when they do not fit a `usize`.
fn fixed_totals(element: &ElementDef, hints: &[Option<usize>]) -> Option<Vec<PropertyTotals>> {
    element
        .properties
        .iter()
        .zip(hints)
        .map(|(property, hint)| {
            let items = hint.unwrap_or(1);
            let record_size = property
                .byte_size()
                .checked_mul(items)?
                .checked_add(property.list_byte_size())?;
            Some(PropertyTotals {
                count: element.count.checked_mul(items)?,
                byte_size: element.count.checked_mul(record_size)?,
            })
        })
        .collect()
}

/// Reads every count prefix of the element and seeks over the payloads.
fn scan_binary<E: ByteOrder, S: Read + Seek>(
    reader: &mut BufReader<S>,
    element: &ElementDef,
) -> Result<(usize, Vec<PropertyTotals>), PlyError> {
    let mut totals = vec![PropertyTotals::default(); element.properties.len()];
    let mut prefix = [0u8; 8];

    for _ in 0..element.count {
        for (property, total) in element.properties.iter().zip(totals.iter_mut()) {
            let count = match property.list_type {
                None => 1,
                Some(list_type) => {
                    let prefix = &mut prefix[..list_type.size_bytes()];
                    reader.read_exact(prefix).map_err(|e| match e.kind() {
                        ErrorKind::UnexpectedEof => PlyError::BinaryParse(element.name.clone()),
                        _ => PlyError::Io(e),
                    })?;
                    to_count(decode_scalar::<E>(list_type, prefix))?
                }
            };
            let overflow = || PlyError::BinaryParse(element.name.clone());
            let payload = count.checked_mul(property.byte_size()).ok_or_else(overflow)?;
            reader.seek_relative(i64::try_from(payload).map_err(|_| overflow())?)?;
            total.count = total.count.checked_add(count).ok_or_else(overflow)?;
            total.byte_size = total
                .byte_size
                .checked_add(property.list_byte_size() + payload)
                .ok_or_else(overflow)?;
        }
    }

    let byte_len = totals
        .iter()
        .try_fold(0usize, |sum, t| sum.checked_add(t.byte_size))
        .ok_or_else(|| PlyError::BinaryParse(element.name.clone()))?;
    Ok((byte_len, totals))
}

/// Consumes the element's record lines. Blank lines are skipped but counted in
/// the returned byte length. Lines are only tokenized when the layout is not
/// fixed.
fn scan_ascii<R: BufRead>(
    reader: &mut R,
    element: &ElementDef,
    hints: &[Option<usize>],
    fixed: bool,
) -> Result<(usize, Vec<PropertyTotals>), PlyError> {
    // Fixed totals only size the output buffers here, the line scan bounds
    // the data.
    let mut totals = if fixed {
        fixed_totals(element, hints)
            .unwrap_or_else(|| vec![PropertyTotals::default(); element.properties.len()])
    } else {
        vec![PropertyTotals::default(); element.properties.len()]
    };

    let mut line = Vec::new();
    let mut cursors = Vec::with_capacity(element.properties.len());
    let mut byte_len = 0;
    let mut records = 0;

    while records < element.count {
        line.clear();
        let line_bytes = reader.read_until(b'\n', &mut line)?;
        if line_bytes == 0 {
            return Err(PlyError::AsciiFileEof(element.name.clone()));
        }
        byte_len += line_bytes;

        let text = std::str::from_utf8(&line)
            .map_err(|_| PlyError::AsciiFileRead(element.name.clone()))?;
        if text.trim().is_empty() {
            continue;
        }
        records += 1;
        if fixed {
            continue;
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let values = AsciiValReader::new(&tokens, &element.name);
        let end = walk_record(&values, element, hints, 0, &mut cursors)?;
        values.check_end(end)?;
        for ((cursor, property), total) in cursors
            .iter()
            .zip(&element.properties)
            .zip(totals.iter_mut())
        {
            total.count += cursor.count;
            total.byte_size += property.list_byte_size() + cursor.count * property.byte_size();
        }
    }

    Ok((byte_len, totals))
}

/// Computes the cursors of the record starting at `base` and returns the
/// position right after it.
///
/// Every list count is read, and checked against `hints` where a length is
/// known.
pub(crate) fn walk_record<R: ScalarReader>(
    reader: &R,
    element: &ElementDef,
    hints: &[Option<usize>],
    base: usize,
    cursors: &mut Vec<PropertyCursor>,
) -> Result<usize, PlyError> {
    cursors.clear();
    let mut pos = base;
    for (property, hint) in element.properties.iter().zip(hints) {
        let cursor = match property.list_type {
            None => PropertyCursor {
                count_pos: None,
                data_pos: pos,
                count: 1,
            },
            Some(list_type) => {
                let count = reader.read_count(list_type, pos)?;
                if let Some(expected) = *hint {
                    if count != expected {
                        return Err(PlyError::ListSizeMismatch {
                            element: element.name.clone(),
                            property: property.name.clone(),
                            expected,
                            found: count,
                        });
                    }
                }
                PropertyCursor {
                    count_pos: Some(pos),
                    data_pos: pos
                        .checked_add(reader.width(list_type))
                        .ok_or_else(|| reader.out_of_range())?,
                    count,
                }
            }
        };
        pos = cursor
            .count
            .checked_mul(reader.width(property.data_type))
            .and_then(|len| cursor.data_pos.checked_add(len))
            .ok_or_else(|| reader.out_of_range())?;
        cursors.push(cursor);
    }
    Ok(pos)
}
