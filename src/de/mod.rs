//! Decoding of element data into descriptor buffers.

mod ascii;
mod binary;
pub(crate) mod val_reader;

use std::io::{BufReader, Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian};

use crate::layout::{walk_record, ElementLayout, PropertyCursor};
use crate::{DecodedBuffer, Descriptor, ElementDef, PlyError, PlyFormat, ScalarBuffer};
use val_reader::ScalarReader;

/// Decodes the properties of `desc` from the raw data of one element.
///
/// `properties` are the element's property indices in descriptor order and
/// `bytes` is the element's whole data range as described by `layout`.
pub(crate) fn decode(
    format: PlyFormat,
    element: &ElementDef,
    layout: &ElementLayout,
    desc: &Descriptor,
    properties: &[usize],
    bytes: &[u8],
) -> Result<DecodedBuffer, PlyError> {
    let mut decoder = RecordDecoder::new(element, layout, desc, properties);
    match format {
        PlyFormat::Ascii => ascii::decode(&mut decoder, bytes)?,
        PlyFormat::BinaryLittleEndian => binary::decode::<LittleEndian>(&mut decoder, bytes)?,
        PlyFormat::BinaryBigEndian => binary::decode::<BigEndian>(&mut decoder, bytes)?,
    }
    Ok(decoder.finish())
}

/// Reads the whole data range of an element. A stream shorter than the layout
/// is an error.
pub(crate) fn load_element<S: Read + Seek>(
    reader: &mut BufReader<S>,
    format: PlyFormat,
    element: &ElementDef,
    layout: &ElementLayout,
) -> Result<Vec<u8>, PlyError> {
    reader.seek(SeekFrom::Start(layout.anchor))?;
    let mut bytes = Vec::new();
    reader
        .by_ref()
        .take(layout.byte_len as u64)
        .read_to_end(&mut bytes)?;
    if bytes.len() < layout.byte_len {
        return Err(match format {
            PlyFormat::Ascii => PlyError::AsciiFileEof(element.name.clone()),
            _ => PlyError::BinaryParse(element.name.clone()),
        });
    }
    Ok(bytes)
}

/// Every encoded value takes at least one byte, which bounds any expected
/// value count by the element's byte length.
fn capacity(values: usize, layout: &ElementLayout) -> usize {
    values.min(layout.byte_len)
}

/// Output buffers of one descriptor, filled record by record.
pub(crate) struct RecordDecoder<'a> {
    element: &'a ElementDef,
    properties: &'a [usize],
    hints: Vec<Option<usize>>,
    cursors: Vec<PropertyCursor>,
    data: ScalarBuffer,
    list_counts: Option<ScalarBuffer>,
}

impl<'a> RecordDecoder<'a> {
    fn new(
        element: &'a ElementDef,
        layout: &ElementLayout,
        desc: &Descriptor,
        properties: &'a [usize],
    ) -> Self {
        let mut hints = layout.hints.clone();
        let mut num_lists = 0;
        for &p in properties {
            if element.properties[p].is_list() {
                num_lists += 1;
                if let Some(hint) = desc.hint() {
                    hints[p] = Some(hint);
                }
            }
        }

        let count_type = desc
            .list_type
            .or_else(|| properties.iter().find_map(|&p| element.properties[p].list_type));
        let list_counts = count_type
            .filter(|_| num_lists > 0)
            .map(|ty| ScalarBuffer::with_capacity(ty, capacity(element.count.saturating_mul(num_lists), layout)));

        Self {
            element,
            properties,
            hints,
            cursors: Vec::with_capacity(element.properties.len()),
            data: ScalarBuffer::with_capacity(
                desc.data_type,
                capacity(layout.total_values(properties), layout),
            ),
            list_counts,
        }
    }

    /// All properties requested in element order, none of them lists, all
    /// stored in the requested type: the element data is the output verbatim.
    fn is_verbatim(&self) -> bool {
        let ty = self.data.scalar_type();
        self.properties.len() == self.element.properties.len()
            && self.properties.iter().enumerate().all(|(i, &p)| i == p)
            && self
                .element
                .properties
                .iter()
                .all(|p| !p.is_list() && p.data_type == ty)
    }

    /// Decodes the record starting at `base` and returns the position after it.
    fn decode_record<R: ScalarReader>(&mut self, reader: &R, base: usize) -> Result<usize, PlyError> {
        let end = walk_record(reader, self.element, &self.hints, base, &mut self.cursors)?;
        reader.check_end(end)?;
        for &p in self.properties {
            let cursor = self.cursors[p];
            reader.read_into(
                self.element.properties[p].data_type,
                cursor.data_pos,
                cursor.count,
                &mut self.data,
            )?;
            if let (Some(counts), Some(_)) = (self.list_counts.as_mut(), cursor.count_pos) {
                counts.push_f64(cursor.count as f64);
            }
        }
        Ok(end)
    }

    fn finish(self) -> DecodedBuffer {
        DecodedBuffer {
            data: self.data,
            list_counts: self.list_counts,
            count: self.element.count,
        }
    }
}
