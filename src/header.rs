use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{PlyError, PlyFormat, ScalarType};

/// PLY property definition.
///
/// A property is a list property iff `list_type` is set; the list type is the
/// integer type used to encode the per-record item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub data_type: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ScalarType>,
}

impl PropertySchema {
    pub fn scalar(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            data_type,
            list_type: None,
        }
    }

    pub fn list(name: impl Into<String>, list_type: ScalarType, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            data_type,
            list_type: Some(list_type),
        }
    }

    pub fn is_list(&self) -> bool {
        self.list_type.is_some()
    }

    pub fn byte_size(&self) -> usize {
        self.data_type.size_bytes()
    }

    /// Size of the count prefix, zero for regular properties.
    pub fn list_byte_size(&self) -> usize {
        self.list_type.map_or(0, |ty| ty.size_bytes())
    }
}

/// PLY element definition (e.g., vertex, face)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDef {
    pub name: String,
    pub count: usize,
    pub properties: Vec<PropertySchema>,
}

impl ElementDef {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            properties: Vec::new(),
        }
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Appends a property. Names must be unique within the element.
    pub fn add_property(&mut self, property: PropertySchema) -> Result<(), PlyError> {
        if self.find_property(&property.name).is_some() {
            return Err(PlyError::DuplicateProperty {
                element: self.name.clone(),
                property: property.name,
            });
        }
        self.properties.push(property);
        Ok(())
    }
}

/// PLY header containing format information and element definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub version: String,
    pub elements: Vec<ElementDef>,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
}

impl PlyHeader {
    pub fn new(format: PlyFormat) -> Self {
        Self {
            format,
            version: "1.0".to_string(),
            elements: Vec::new(),
            comments: Vec::new(),
            obj_info: Vec::new(),
        }
    }

    /// Parse a PLY header from a reader.
    ///
    /// Returns the header and the number of bytes it occupied, which is the
    /// offset of the first element record. Parsing stops at the first error.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<(Self, usize), PlyError> {
        let mut line = Vec::new();
        let mut bytes_read = reader.read_until(b'\n', &mut line)?;
        let mut line_no = 1;

        let first = std::str::from_utf8(&line).map_err(|_| PlyError::InvalidFile)?;
        if first.split_whitespace().next() != Some("ply") {
            return Err(PlyError::InvalidFile);
        }

        let mut format = None;
        let mut version = String::new();
        let mut header = PlyHeader::new(PlyFormat::Ascii);

        loop {
            line.clear();
            let line_bytes = reader.read_until(b'\n', &mut line)?;
            if line_bytes == 0 {
                return Err(PlyError::HeaderEof);
            }
            bytes_read += line_bytes;
            line_no += 1;

            let text = std::str::from_utf8(&line).map_err(|_| PlyError::LineParse(line_no))?;
            let parts: Vec<&str> = text.split_whitespace().collect();
            let Some(&cmd) = parts.first() else {
                return Err(PlyError::LineParse(line_no));
            };

            match cmd {
                "end_header" => break,
                "comment" => header.comments.push(rest_of_line(text, cmd)),
                "obj_info" => header.obj_info.push(rest_of_line(text, cmd)),
                "format" => {
                    if parts.len() != 3 {
                        return Err(PlyError::FormatCmd(line_no));
                    }
                    format = Some(
                        PlyFormat::parse(parts[1])
                            .ok_or_else(|| PlyError::InvalidFormat(parts[1].to_string()))?,
                    );
                    version = parts[2].to_string();
                }
                "element" => {
                    if parts.len() != 3 {
                        return Err(PlyError::ElementCmd(line_no));
                    }
                    let count = parts[2]
                        .parse::<usize>()
                        .map_err(|_| PlyError::ElementCmd(line_no))?;
                    header.add_element(ElementDef::new(parts[1], count))?;
                }
                "property" => {
                    let element = header
                        .elements
                        .last_mut()
                        .ok_or(PlyError::PropertyCmd(line_no))?;
                    let property = parse_property(&parts).ok_or(PlyError::PropertyCmd(line_no))?;
                    element.add_property(property)?;
                }
                _ => return Err(PlyError::UnrecognizedCommand(cmd.to_string())),
            }
        }

        header.format = format
            .ok_or_else(|| PlyError::InvalidFormat("missing format line".to_string()))?;
        header.version = version;

        Ok((header, bytes_read))
    }

    /// Get element definition by name
    pub fn get_element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Check if this header defines an element with the given name
    pub fn has_element(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.name == name)
    }

    pub(crate) fn element_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    /// Appends an element. Names must be unique within the header.
    pub fn add_element(&mut self, element: ElementDef) -> Result<(), PlyError> {
        if self.has_element(&element.name) {
            return Err(PlyError::DuplicateElement(element.name));
        }
        self.elements.push(element);
        Ok(())
    }

    /// Writes the textual header, up to and including `end_header`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), PlyError> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format {} {}", self.format, self.version)?;
        for comment in &self.comments {
            writeln!(writer, "comment {comment}")?;
        }
        for info in &self.obj_info {
            writeln!(writer, "obj_info {info}")?;
        }
        for element in &self.elements {
            writeln!(writer, "element {} {}", element.name, element.count)?;
            for property in &element.properties {
                match property.list_type {
                    None => writeln!(
                        writer,
                        "property {} {}",
                        property.data_type, property.name
                    )?,
                    Some(list_type) => writeln!(
                        writer,
                        "property list {} {} {}",
                        list_type, property.data_type, property.name
                    )?,
                }
            }
        }
        writeln!(writer, "end_header")?;
        Ok(())
    }

    /// Human readable dump of the format, elements and properties.
    pub fn summary(&self) -> String {
        let format = match self.format {
            PlyFormat::Ascii => "Ascii",
            PlyFormat::BinaryLittleEndian => "Binary Little Endian",
            PlyFormat::BinaryBigEndian => "Binary Big Endian",
        };
        let name_width = self
            .elements
            .iter()
            .flat_map(|e| e.properties.iter())
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);

        let mut out = format!("PLY: {} {}\n", format, self.version);
        for element in &self.elements {
            out.push_str(&format!("   '{}' count: {}\n", element.name, element.count));
            for property in &element.properties {
                let pad = " ".repeat(name_width - property.name.len());
                let data = format!("{:>7}({} bytes)", property.data_type, property.byte_size());
                let line = match property.list_type {
                    None => format!("      '{}'{} | {}\n", property.name, pad, data),
                    Some(list_type) => format!(
                        "      '{}'{} | {:>7}({} bytes) {}\n",
                        property.name,
                        pad,
                        list_type,
                        property.list_byte_size(),
                        data
                    ),
                };
                out.push_str(&line);
            }
        }
        out
    }
}

/// Regular form `property <type> <name>` first, then the list form
/// `property list <count_type> <type> <name>`.
fn parse_property(parts: &[&str]) -> Option<PropertySchema> {
    match parts {
        [_, data_type, name] if *data_type != "list" => {
            Some(PropertySchema::scalar(*name, ScalarType::parse(data_type)?))
        }
        [_, "list", list_type, data_type, name] => Some(PropertySchema::list(
            *name,
            ScalarType::parse(list_type)?,
            ScalarType::parse(data_type)?,
        )),
        _ => None,
    }
}

fn rest_of_line(text: &str, cmd: &str) -> String {
    text.trim_start()
        .strip_prefix(cmd)
        .unwrap_or("")
        .trim()
        .to_string()
}
