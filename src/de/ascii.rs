use super::val_reader::AsciiValReader;
use super::RecordDecoder;
use crate::PlyError;

/// One record per non-blank line; tokens are converted from the declared
/// property type to the requested one.
pub(super) fn decode(decoder: &mut RecordDecoder<'_>, bytes: &[u8]) -> Result<(), PlyError> {
    let element = decoder.element;
    let text = std::str::from_utf8(bytes)
        .map_err(|_| PlyError::AsciiFileRead(element.name.clone()))?;

    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let mut tokens = Vec::new();
    for _ in 0..element.count {
        let line = lines
            .next()
            .ok_or_else(|| PlyError::AsciiFileEof(element.name.clone()))?;
        tokens.clear();
        tokens.extend(line.split_whitespace());
        let reader = AsciiValReader::new(&tokens, &element.name);
        decoder.decode_record(&reader, 0)?;
    }
    Ok(())
}
