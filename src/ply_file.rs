use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, trace};

use crate::layout::{plan, resolve};
use crate::{
    de, ser, DecodedBuffer, Descriptor, DescriptorId, ElementDef, PlyError, PlyFormat, PlyHeader,
    PropertySchema,
};

/// How a [`PlyFile`] uses its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write(PlyFormat),
}

impl FromStr for OpenMode {
    type Err = PlyError;

    /// `"r"` and `"rb"` read, `"w"` writes ASCII, `"wb"` writes binary in the
    /// byte order of the host.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "rb" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write(PlyFormat::Ascii)),
            "wb" => Ok(OpenMode::Write(PlyFormat::native())),
            _ => Err(PlyError::InvalidFormat(format!("open mode '{s}'"))),
        }
    }
}

enum Stream<S> {
    Reader(BufReader<S>),
    Writer(S),
}

/// An open PLY file.
///
/// Descriptors registered with [`PlyFile::add_descriptor`] drive both
/// [`PlyFile::read`] and [`PlyFile::write`]. Decoded buffers stay owned by the
/// file until taken with [`PlyFile::take_decoded`].
pub struct PlyFile<S> {
    mode: OpenMode,
    stream: Stream<S>,
    header: PlyHeader,
    parsed: bool,
    data_start: u64,
    host_format: PlyFormat,
    descriptors: Vec<Descriptor>,
    decoded: Vec<Option<DecodedBuffer>>,
}

impl PlyFile<File> {
    /// Opens `path` with a mode string, see [`OpenMode`].
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self, PlyError> {
        let path = path.as_ref();
        match mode.parse()? {
            OpenMode::Read => {
                let file = File::open(path).map_err(|source| PlyError::FileOpen {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::from_reader(file))
            }
            OpenMode::Write(format) => Self::create(path, format),
        }
    }

    /// Creates (or truncates) `path` for writing in `format`.
    pub fn create(path: impl AsRef<Path>, format: PlyFormat) -> Result<Self, PlyError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| PlyError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(file, format))
    }
}

impl<S> PlyFile<S> {
    fn with_stream(mode: OpenMode, stream: Stream<S>, format: PlyFormat) -> Self {
        Self {
            mode,
            stream,
            header: PlyHeader::new(format),
            parsed: false,
            data_start: 0,
            host_format: PlyFormat::native(),
            descriptors: Vec::new(),
            decoded: Vec::new(),
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Registers a descriptor after checking its shape. Descriptors added to a
    /// writer must carry their data.
    pub fn add_descriptor(&mut self, desc: Descriptor) -> Result<DescriptorId, PlyError> {
        match self.mode {
            OpenMode::Read => desc.validate()?,
            OpenMode::Write(_) => desc.validate_for_write()?,
        }
        trace!(
            "descriptor {}: element '{}', properties {:?}",
            self.descriptors.len(),
            desc.element_name,
            desc.property_names
        );
        self.descriptors.push(desc);
        self.decoded.push(None);
        Ok(DescriptorId(self.descriptors.len() - 1))
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(id.0)
    }

    /// Output of the last successful decode of descriptor `id`.
    pub fn decoded(&self, id: DescriptorId) -> Option<&DecodedBuffer> {
        self.decoded.get(id.0)?.as_ref()
    }

    pub fn take_decoded(&mut self, id: DescriptorId) -> Option<DecodedBuffer> {
        self.decoded.get_mut(id.0)?.take()
    }

    /// Whether the element named by `desc` exists and has every property it
    /// names. Only meaningful once the header is known.
    pub fn has_properties(&self, desc: &Descriptor) -> bool {
        resolve(&self.header, desc).is_ok()
    }

    pub fn find_element(&self, name: &str) -> Option<&ElementDef> {
        self.header.get_element(name)
    }

    pub fn find_property(&self, element: &str, property: &str) -> Option<&PropertySchema> {
        self.find_element(element)?.find_property(property)
    }

    pub fn header(&self) -> &PlyHeader {
        &self.header
    }

    pub fn format(&self) -> PlyFormat {
        self.header.format
    }

    /// Binary format in the byte order of this machine.
    pub fn host_format(&self) -> PlyFormat {
        self.host_format
    }

    /// Declares an element ahead of writing. Descriptors are then bound to
    /// its properties instead of defining them.
    pub fn declare_element(&mut self, element: ElementDef) -> Result<(), PlyError> {
        if self.mode == OpenMode::Read {
            return Err(PlyError::FileNotOpen("writing"));
        }
        self.header.add_element(element)
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.header.comments.push(comment.into());
    }

    pub fn add_obj_info(&mut self, info: impl Into<String>) {
        self.header.obj_info.push(info.into());
    }

    /// Prints the format, elements and properties of the header to stdout.
    pub fn print_header(&self) {
        print!("{}", self.header.summary());
    }

    /// Releases the stream and every decoded buffer.
    pub fn close(self) {}

    pub fn into_inner(self) -> S {
        match self.stream {
            Stream::Reader(reader) => reader.into_inner(),
            Stream::Writer(writer) => writer,
        }
    }
}

impl<S: Read + Seek> PlyFile<S> {
    pub fn from_reader(reader: S) -> Self {
        Self::with_stream(
            OpenMode::Read,
            Stream::Reader(BufReader::new(reader)),
            PlyFormat::Ascii,
        )
    }

    /// Parses the header from the start of the stream. Later calls return the
    /// header parsed the first time.
    pub fn parse_header(&mut self) -> Result<&PlyHeader, PlyError> {
        let Stream::Reader(reader) = &mut self.stream else {
            return Err(PlyError::FileNotOpen("reading"));
        };
        if !self.parsed {
            reader.seek(SeekFrom::Start(0))?;
            let (header, data_start) = PlyHeader::parse(&mut *reader)?;
            debug!(
                "parsed {} header with {} elements, data at byte {}",
                header.format,
                header.elements.len(),
                data_start
            );
            self.header = header;
            self.data_start = data_start as u64;
            self.parsed = true;
        }
        Ok(&self.header)
    }

    /// Decodes every registered descriptor.
    ///
    /// Descriptors are decoded in the order they were added. On failure the
    /// outputs of the descriptors decoded before the failing one are kept.
    pub fn read(&mut self) -> Result<(), PlyError> {
        if self.descriptors.is_empty() {
            return Err(PlyError::NoRequests);
        }
        self.parse_header()?;
        let Stream::Reader(reader) = &mut self.stream else {
            return Err(PlyError::FileNotOpen("reading"));
        };

        let header = &self.header;
        let layouts = plan(reader, header, self.data_start, &self.descriptors)?;

        let mut resolved = Vec::with_capacity(self.descriptors.len());
        let mut last_use = vec![0; header.elements.len()];
        for (idx, desc) in self.descriptors.iter().enumerate() {
            let (element_idx, properties) = resolve(header, desc)?;
            last_use[element_idx] = idx;
            resolved.push((element_idx, properties));
        }

        let mut element_bytes: Vec<Option<Vec<u8>>> = vec![None; header.elements.len()];
        for (idx, (desc, (element_idx, properties))) in
            self.descriptors.iter().zip(&resolved).enumerate()
        {
            let element = &header.elements[*element_idx];
            let layout = layouts[*element_idx]
                .as_ref()
                .ok_or_else(|| PlyError::ElementNotFound(element.name.clone()))?;

            let bytes: &[u8] = match &mut element_bytes[*element_idx] {
                Some(bytes) => bytes,
                slot => slot.insert(de::load_element(reader, header.format, element, layout)?),
            };
            let decoded = de::decode(header.format, element, layout, desc, properties, bytes)?;
            trace!(
                "descriptor {}: decoded {} values of element '{}'",
                idx,
                decoded.data.len(),
                element.name
            );
            self.decoded[idx] = Some(decoded);

            if last_use[*element_idx] == idx {
                element_bytes[*element_idx] = None;
            }
        }
        Ok(())
    }
}

impl<S: Write> PlyFile<S> {
    pub fn from_writer(writer: S, format: PlyFormat) -> Self {
        Self::with_stream(OpenMode::Write(format), Stream::Writer(writer), format)
    }

    /// Writes the header and the data of every registered descriptor.
    pub fn write(&mut self) -> Result<(), PlyError> {
        if self.descriptors.is_empty() {
            return Err(PlyError::NoRequests);
        }
        let Stream::Writer(writer) = &mut self.stream else {
            return Err(PlyError::FileNotOpen("writing"));
        };
        ser::write_ply(writer, &mut self.header, &self.descriptors)
    }
}
