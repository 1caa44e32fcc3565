//! Encoding of descriptor buffers into PLY element data.

use std::io::Write;

use byteorder::{BigEndian, LittleEndian};
use log::debug;

use crate::de::val_reader::to_count;
use crate::layout::resolve;
use crate::{
    Descriptor, ElementDef, PlyError, PlyFormat, PlyHeader, PropertySchema, ScalarBuffer,
    ScalarType,
};

pub mod val_writer;

use val_writer::{write_values, AsciiValWriter, BinValWriter, ScalarWriter};

/// Element data is handed to the underlying writer in chunks of this size.
pub const WRITE_CHUNK_SIZE: usize = 32 * 65536;

/// Writes the header and every element of `header`, taking the values from
/// `descriptors`.
///
/// A header without elements gets them from the descriptors, in the order
/// they were added. Everything is validated before the first byte is written.
pub(crate) fn write_ply<W: Write>(
    writer: &mut W,
    header: &mut PlyHeader,
    descriptors: &[Descriptor],
) -> Result<(), PlyError> {
    for desc in descriptors {
        desc.validate_for_write()?;
    }
    if header.elements.is_empty() {
        declare_elements(header, descriptors)?;
    }
    let bindings = bind(header, descriptors)?;

    header.write_to(&mut *writer)?;
    for (element, bindings) in header.elements.iter().zip(&bindings) {
        let bytes = encode_element(header.format, element, bindings)?;
        write_chunked(writer, &bytes)?;
        debug!(
            "element '{}': wrote {} records, {} bytes",
            element.name,
            element.count,
            bytes.len()
        );
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_chunked<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), PlyError> {
    for chunk in bytes.chunks(WRITE_CHUNK_SIZE) {
        writer.write_all(chunk)?;
    }
    Ok(())
}

/// Creates one element per distinct element name, with the properties of all
/// descriptors naming it. A descriptor with a list type defines list
/// properties.
fn declare_elements(header: &mut PlyHeader, descriptors: &[Descriptor]) -> Result<(), PlyError> {
    for desc in descriptors {
        let data = desc
            .data
            .as_ref()
            .ok_or_else(|| PlyError::MissingData(desc.element_name.clone()))?;
        let num_lists = if desc.list_type.is_some() {
            desc.num_properties()
        } else {
            0
        };
        let records = desc
            .count
            .unwrap_or_else(|| infer_records(desc, data, desc.num_properties() - num_lists, num_lists));

        let idx = match header.element_index(&desc.element_name) {
            Some(idx) => {
                let element = &header.elements[idx];
                if element.count != records {
                    return Err(PlyError::ConflictingNumberOfElements {
                        element: element.name.clone(),
                        declared: element.count,
                        requested: records,
                    });
                }
                idx
            }
            None => {
                header
                    .elements
                    .push(ElementDef::new(desc.element_name.clone(), records));
                header.elements.len() - 1
            }
        };

        let element = &mut header.elements[idx];
        for name in &desc.property_names {
            let property = match desc.list_type {
                Some(list_type) => PropertySchema::list(name.clone(), list_type, desc.data_type),
                None => PropertySchema::scalar(name.clone(), desc.data_type),
            };
            element.add_property(property)?;
        }
    }
    Ok(())
}

fn infer_records(
    desc: &Descriptor,
    data: &ScalarBuffer,
    num_regular: usize,
    num_lists: usize,
) -> usize {
    match (num_lists, desc.hint(), &desc.list_counts) {
        (0, _, _) => data.len() / num_regular,
        (_, Some(hint), _) => {
            data.len() / num_lists.saturating_mul(hint).saturating_add(num_regular)
        }
        (_, None, Some(counts)) => counts.len() / num_lists,
        (_, None, None) => 0,
    }
}

/// A descriptor checked against the element it writes.
struct Binding<'a> {
    data: &'a ScalarBuffer,
    /// Element property index of each descriptor property.
    properties: Vec<usize>,
    hint: Option<usize>,
    /// Length of every list, record after record, when there is no hint.
    list_lens: Vec<usize>,
}

impl<'a> Binding<'a> {
    fn new(
        desc: &'a Descriptor,
        element: &ElementDef,
        properties: Vec<usize>,
    ) -> Result<Self, PlyError> {
        let data = desc
            .data
            .as_ref()
            .ok_or_else(|| PlyError::MissingData(element.name.clone()))?;
        let lists: Vec<(&str, ScalarType)> = properties
            .iter()
            .map(|&p| &element.properties[p])
            .filter_map(|p| Some((p.name.as_str(), p.list_type?)))
            .collect();
        let num_lists = lists.len();
        let num_regular = properties.len() - num_lists;

        let records = desc
            .count
            .unwrap_or_else(|| infer_records(desc, data, num_regular, num_lists));
        if records != element.count {
            return Err(PlyError::ConflictingNumberOfElements {
                element: element.name.clone(),
                declared: element.count,
                requested: records,
            });
        }
        let size_mismatch = |expected: usize, found: usize| PlyError::BufferSizeMismatch {
            element: element.name.clone(),
            expected,
            found,
        };

        let mut list_lens = Vec::new();
        if num_lists > 0 {
            match (&desc.list_counts, desc.hint()) {
                (None, None) => return Err(PlyError::MissingListCounts(element.name.clone())),
                (None, Some(hint)) => {
                    for &(_, list_type) in &lists {
                        check_count(list_type, hint)?;
                    }
                }
                (Some(counts), hint) => {
                    let expected = records.saturating_mul(num_lists);
                    if counts.len() != expected {
                        return Err(size_mismatch(expected, counts.len()));
                    }
                    for idx in 0..counts.len() {
                        let (name, list_type) = lists[idx % num_lists];
                        let len = to_count(counts.get_f64(idx).unwrap_or_default())?;
                        check_count(list_type, len)?;
                        if let Some(expected) = hint.filter(|&h| h != len) {
                            return Err(PlyError::ListSizeMismatch {
                                element: element.name.clone(),
                                property: name.to_string(),
                                expected,
                                found: len,
                            });
                        }
                        list_lens.push(len);
                    }
                }
            }
        }

        let expected = match (num_lists, desc.hint()) {
            (0, _) => records.saturating_mul(num_regular),
            (_, Some(hint)) => {
                records.saturating_mul(num_lists.saturating_mul(hint).saturating_add(num_regular))
            }
            (_, None) => records * num_regular + list_lens.iter().sum::<usize>(),
        };
        if data.len() != expected {
            return Err(size_mismatch(expected, data.len()));
        }

        Ok(Self {
            data,
            properties,
            hint: desc.hint(),
            list_lens,
        })
    }
}

/// Checks that a list length can be stored in the count type of its property.
fn check_count(list_type: ScalarType, count: usize) -> Result<(), PlyError> {
    let max = match list_type {
        ScalarType::I8 => i8::MAX as usize,
        ScalarType::U8 => u8::MAX as usize,
        ScalarType::I16 => i16::MAX as usize,
        ScalarType::U16 => u16::MAX as usize,
        ScalarType::I32 => i32::MAX as usize,
        ScalarType::U32 => u32::MAX as usize,
        ScalarType::F32 | ScalarType::F64 => return Err(PlyError::InvalidListType(list_type)),
    };
    if count > max {
        return Err(PlyError::InvalidListCount(count as f64));
    }
    Ok(())
}

/// Binds every descriptor to its element, per element in descriptor order.
///
/// Each declared property must be provided by exactly one descriptor, in the
/// declared type.
fn bind<'a>(
    header: &PlyHeader,
    descriptors: &'a [Descriptor],
) -> Result<Vec<Vec<Binding<'a>>>, PlyError> {
    let mut bindings: Vec<Vec<Binding>> = header.elements.iter().map(|_| Vec::new()).collect();
    let mut provided: Vec<Vec<bool>> = header
        .elements
        .iter()
        .map(|e| vec![false; e.properties.len()])
        .collect();

    for desc in descriptors {
        let (element_idx, properties) = resolve(header, desc)?;
        let element = &header.elements[element_idx];
        for &p in &properties {
            let property = &element.properties[p];
            if std::mem::replace(&mut provided[element_idx][p], true) {
                return Err(PlyError::DuplicateProperty {
                    element: element.name.clone(),
                    property: property.name.clone(),
                });
            }
            if property.data_type != desc.data_type {
                return Err(PlyError::TypeMismatch {
                    property: property.name.clone(),
                    expected: property.data_type.to_string(),
                    found: desc.data_type.to_string(),
                });
            }
        }
        bindings[element_idx].push(Binding::new(desc, element, properties)?);
    }

    for (element, provided) in header.elements.iter().zip(&provided) {
        if let Some(missing) = element
            .properties
            .iter()
            .zip(provided)
            .find_map(|(property, &done)| (!done).then_some(property))
        {
            return Err(PlyError::WriteRequiredPropertyMissing {
                element: element.name.clone(),
                property: missing.name.clone(),
            });
        }
    }

    Ok(bindings)
}

fn encode_element(
    format: PlyFormat,
    element: &ElementDef,
    bindings: &[Binding<'_>],
) -> Result<Vec<u8>, PlyError> {
    let mut bytes = Vec::new();
    match format {
        PlyFormat::Ascii => {
            encode_records(&mut AsciiValWriter::new(&mut bytes), element, bindings)?
        }
        PlyFormat::BinaryLittleEndian => encode_records(
            &mut BinValWriter::<_, LittleEndian>::new(&mut bytes),
            element,
            bindings,
        )?,
        PlyFormat::BinaryBigEndian => encode_records(
            &mut BinValWriter::<_, BigEndian>::new(&mut bytes),
            element,
            bindings,
        )?,
    }
    Ok(bytes)
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    binding: usize,
    start: usize,
    count: usize,
}

/// Interleaves the descriptor buffers record by record, in the property order
/// of the element.
fn encode_records<S: ScalarWriter>(
    out: &mut S,
    element: &ElementDef,
    bindings: &[Binding<'_>],
) -> Result<(), PlyError> {
    let mut data_pos = vec![0; bindings.len()];
    let mut list_idx = vec![0; bindings.len()];
    let mut slots = vec![Slot::default(); element.properties.len()];

    for _ in 0..element.count {
        for (b, binding) in bindings.iter().enumerate() {
            for &p in &binding.properties {
                let count = if element.properties[p].is_list() {
                    let len = match binding.hint {
                        Some(hint) => hint,
                        None => binding.list_lens[list_idx[b]],
                    };
                    list_idx[b] += 1;
                    len
                } else {
                    1
                };
                slots[p] = Slot {
                    binding: b,
                    start: data_pos[b],
                    count,
                };
                data_pos[b] += count;
            }
        }

        for (property, slot) in element.properties.iter().zip(&slots) {
            if let Some(list_type) = property.list_type {
                out.write_count(list_type, slot.count)?;
            }
            write_values(out, bindings[slot.binding].data, slot.start, slot.count)?;
        }
        out.write_row_end()?;
    }
    Ok(())
}
