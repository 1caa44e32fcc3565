use crate::{PlyError, ScalarBuffer, ScalarType};

/// Handle to a descriptor registered with a [`crate::PlyFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) usize);

impl DescriptorId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Request (read) or offer (write) of a set of properties of one element.
///
/// On read, `data_type` is the type the values are decoded into, and
/// `list_type`, when set, is the type of the returned list counts. On write,
/// `data` holds the values, record after record with the properties in the
/// order of `property_names`, and `list_counts` holds one count per record
/// and list property.
///
/// A `list_size_hint` of zero means list lengths are discovered from the data.
/// Any other value states that every list of this descriptor holds exactly
/// that many items.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub element_name: String,
    pub property_names: Vec<String>,
    pub data_type: ScalarType,
    pub list_type: Option<ScalarType>,
    pub data: Option<ScalarBuffer>,
    pub list_counts: Option<ScalarBuffer>,
    pub count: Option<usize>,
    pub list_size_hint: usize,
}

impl Descriptor {
    /// Read request for `properties` of `element`, decoded as `data_type`.
    pub fn new(element: impl Into<String>, properties: &[&str], data_type: ScalarType) -> Self {
        Self {
            element_name: element.into(),
            property_names: properties.iter().map(|p| p.to_string()).collect(),
            data_type,
            list_type: None,
            data: None,
            list_counts: None,
            count: None,
            list_size_hint: 0,
        }
    }

    /// Write offer for `properties` of `element`, backed by `data`.
    pub fn from_data(
        element: impl Into<String>,
        properties: &[&str],
        data: impl Into<ScalarBuffer>,
    ) -> Self {
        let data = data.into();
        Self {
            data_type: data.scalar_type(),
            data: Some(data),
            ..Self::new(element, properties, ScalarType::U8)
        }
    }

    pub fn with_list_type(mut self, list_type: ScalarType) -> Self {
        self.list_type = Some(list_type);
        self
    }

    pub fn with_list_size_hint(mut self, hint: usize) -> Self {
        self.list_size_hint = hint;
        self
    }

    pub fn with_data(mut self, data: impl Into<ScalarBuffer>) -> Self {
        let data = data.into();
        self.data_type = data.scalar_type();
        self.data = Some(data);
        self
    }

    pub fn with_list_counts(mut self, counts: impl Into<ScalarBuffer>) -> Self {
        let counts = counts.into();
        self.list_type = Some(counts.scalar_type());
        self.list_counts = Some(counts);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn num_properties(&self) -> usize {
        self.property_names.len()
    }

    pub(crate) fn hint(&self) -> Option<usize> {
        (self.list_size_hint > 0).then_some(self.list_size_hint)
    }

    /// Shape checks that do not need the header.
    pub(crate) fn validate(&self) -> Result<(), PlyError> {
        if self.element_name.is_empty() {
            return Err(PlyError::EmptyElementName);
        }
        if self.property_names.is_empty() {
            return Err(PlyError::NoRequestedProperties);
        }
        for (idx, name) in self.property_names.iter().enumerate() {
            if name.is_empty() {
                return Err(PlyError::EmptyPropertyName);
            }
            if self.property_names[..idx].contains(name) {
                return Err(PlyError::DuplicateProperty {
                    element: self.element_name.clone(),
                    property: name.clone(),
                });
            }
        }
        if let Some(list_type) = self.list_type {
            if !list_type.is_integral() {
                return Err(PlyError::InvalidListType(list_type));
            }
        }
        Ok(())
    }

    /// Additional checks for descriptors handed to a writer.
    pub(crate) fn validate_for_write(&self) -> Result<(), PlyError> {
        self.validate()?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| PlyError::MissingData(self.element_name.clone()))?;
        if data.scalar_type() != self.data_type {
            return Err(PlyError::InvalidDataType {
                declared: self.data_type,
                found: data.scalar_type(),
            });
        }
        if let Some(counts) = &self.list_counts {
            let found = counts.scalar_type();
            if !found.is_integral() || self.list_type != Some(found) {
                return Err(PlyError::InvalidListType(found));
            }
        }
        if self.list_type.is_some() && self.hint().is_none() && self.list_counts.is_none() {
            return Err(PlyError::MissingListCounts(self.element_name.clone()));
        }
        Ok(())
    }
}
