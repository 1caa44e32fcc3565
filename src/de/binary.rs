use byteorder::ByteOrder;
use log::debug;

use super::val_reader::{extend_encoded, BinValReader};
use super::RecordDecoder;
use crate::PlyError;

pub(super) fn decode<E: ByteOrder>(
    decoder: &mut RecordDecoder<'_>,
    bytes: &[u8],
) -> Result<(), PlyError> {
    let element = decoder.element;

    if decoder.is_verbatim() {
        debug!("element '{}': bulk copy of {} bytes", element.name, bytes.len());
        extend_encoded::<E>(&mut decoder.data, bytes);
        return Ok(());
    }

    let reader = BinValReader::<E>::new(bytes, &element.name);
    let mut base = 0;
    for _ in 0..element.count {
        base = decoder.decode_record(&reader, base)?;
    }
    Ok(())
}
