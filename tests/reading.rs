//! Reading PLY data through descriptors

use ply_codec::{error_message, Descriptor, PlyError, PlyFile, PlyFormat, ScalarType};
use std::io::Cursor;

const CUBE: &str = r#"ply
format ascii 1.0
comment made by Greg Turk
comment this file is a cube
element vertex 8
property float x
property float y
property float z
element face 6
property list uchar int vertex_index
end_header
0 0 0
0 0 1
0 1 1
0 1 0
1 0 0
1 0 1
1 1 1
1 1 0
4 0 1 2 3
4 7 6 5 4
4 0 4 5 1
4 1 5 6 2
4 2 6 7 3
4 3 7 4 0
"#;

fn open(data: impl AsRef<[u8]>) -> PlyFile<Cursor<Vec<u8>>> {
    PlyFile::from_reader(Cursor::new(data.as_ref().to_vec()))
}

#[test]
fn test_cube() {
    let mut ply = open(CUBE);
    let vertices = ply
        .add_descriptor(Descriptor::new("vertex", &["x", "y", "z"], ScalarType::F32))
        .unwrap();
    let faces = ply
        .add_descriptor(
            Descriptor::new("face", &["vertex_index"], ScalarType::U32).with_list_size_hint(4),
        )
        .unwrap();
    ply.read().unwrap();

    assert_eq!(ply.header().comments.len(), 2);

    let vertices = ply.take_decoded(vertices).unwrap();
    assert_eq!(vertices.count, 8);
    let positions = vertices.as_slice::<f32>().unwrap();
    assert_eq!(positions.len(), 24);
    assert_eq!(&positions[15..18], &[1.0, 0.0, 1.0]);

    let faces = ply.take_decoded(faces).unwrap();
    assert_eq!(faces.count, 6);
    let indices = faces.as_slice::<u32>().unwrap();
    assert_eq!(&indices[..8], &[0, 1, 2, 3, 7, 6, 5, 4]);
    assert_eq!(faces.list_counts_as::<u8>().unwrap(), &[4; 6]);
}

fn binary_vertices() -> Vec<u8> {
    let mut data = b"ply
format binary_little_endian 1.0
element vertex 3
property float x
property float y
property float z
property uchar red
end_header
"
    .to_vec();
    let records = [(1.0f32, 0.0f32, 1.0f32, 255u8), (0.0, 0.0, 1.0, 125), (1.0, 0.0, 0.0, 0)];
    for (x, y, z, red) in records {
        data.extend_from_slice(&x.to_le_bytes());
        data.extend_from_slice(&y.to_le_bytes());
        data.extend_from_slice(&z.to_le_bytes());
        data.push(red);
    }
    data
}

#[test]
fn test_subset_in_descriptor_order() {
    let mut ply = open(binary_vertices());
    let zx = ply
        .add_descriptor(Descriptor::new("vertex", &["z", "x"], ScalarType::F32))
        .unwrap();
    let red = ply
        .add_descriptor(Descriptor::new("vertex", &["red"], ScalarType::F32))
        .unwrap();
    ply.read().unwrap();

    assert_eq!(
        ply.decoded(zx).unwrap().as_slice::<f32>().unwrap(),
        &[1.0, 1.0, 1.0, 0.0, 0.0, 1.0]
    );
    assert_eq!(
        ply.decoded(red).unwrap().as_slice::<f32>().unwrap(),
        &[255.0, 125.0, 0.0]
    );
    assert!(ply.decoded(red).unwrap().list_counts.is_none());
}

#[test]
fn test_whole_element_in_declared_type() {
    let data = b"ply
format binary_little_endian 1.0
element point 2
property double a
property double b
end_header
";
    let mut bytes = data.to_vec();
    for v in [0.5f64, -1.0, 2.25, 1e10] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    let mut ply = open(bytes);
    let id = ply
        .add_descriptor(Descriptor::new("point", &["a", "b"], ScalarType::F64))
        .unwrap();
    ply.read().unwrap();
    assert_eq!(
        ply.decoded(id).unwrap().as_slice::<f64>().unwrap(),
        &[0.5, -1.0, 2.25, 1e10]
    );
}

#[test]
fn test_big_endian_with_lists() {
    let mut data = b"ply
format binary_big_endian 1.0
element vertex 2
property short a
property float b
element face 1
property list uchar uint idx
end_header
"
    .to_vec();
    data.extend_from_slice(&(-2i16).to_be_bytes());
    data.extend_from_slice(&1.5f32.to_be_bytes());
    data.extend_from_slice(&7i16.to_be_bytes());
    data.extend_from_slice(&(-0.25f32).to_be_bytes());
    data.push(3);
    for idx in [10u32, 20, 30] {
        data.extend_from_slice(&idx.to_be_bytes());
    }

    let mut ply = open(data);
    let vertices = ply
        .add_descriptor(Descriptor::new("vertex", &["b", "a"], ScalarType::F64))
        .unwrap();
    let faces = ply
        .add_descriptor(
            Descriptor::new("face", &["idx"], ScalarType::U32).with_list_type(ScalarType::I32),
        )
        .unwrap();
    ply.read().unwrap();

    assert_eq!(ply.format(), PlyFormat::BinaryBigEndian);
    assert_eq!(
        ply.decoded(vertices).unwrap().as_slice::<f64>().unwrap(),
        &[1.5, -2.0, -0.25, 7.0]
    );
    let faces = ply.decoded(faces).unwrap();
    assert_eq!(faces.as_slice::<u32>().unwrap(), &[10, 20, 30]);
    assert_eq!(faces.list_counts_as::<i32>().unwrap(), &[3]);
}

const VARYING_FACES: &str = "ply
format ascii 1.0
element vertex 2
property float x
element face 3
property list uint8 int32 vertex_indices
end_header
0.5
1.5
3 0 1 2
4 0 1 2 3
2 5 6
";

#[test]
fn test_varying_lists_without_hint() {
    let mut ply = open(VARYING_FACES);
    let faces = ply
        .add_descriptor(Descriptor::new("face", &["vertex_indices"], ScalarType::I32))
        .unwrap();
    ply.read().unwrap();

    let faces = ply.decoded(faces).unwrap();
    assert_eq!(faces.as_slice::<i32>().unwrap(), &[0, 1, 2, 0, 1, 2, 3, 5, 6]);
    assert_eq!(faces.list_counts_as::<u8>().unwrap(), &[3, 4, 2]);
}

#[test]
fn test_hint_disagreeing_with_data_is_rejected() {
    let mut ply = open(VARYING_FACES);
    let vertices = ply
        .add_descriptor(Descriptor::new("vertex", &["x"], ScalarType::F32))
        .unwrap();
    let faces = ply
        .add_descriptor(
            Descriptor::new("face", &["vertex_indices"], ScalarType::I32).with_list_size_hint(3),
        )
        .unwrap();

    let err = ply.read().unwrap_err();
    assert!(matches!(
        err,
        PlyError::ListSizeMismatch { expected: 3, found: 4, .. }
    ));
    assert_eq!(
        ply.decoded(vertices).unwrap().as_slice::<f32>().unwrap(),
        &[0.5, 1.5]
    );
    assert!(ply.decoded(faces).is_none());
}

#[test]
fn test_binary_hint_disagreeing_with_data_is_rejected() {
    let mut data = b"ply
format binary_little_endian 1.0
element face 3
property list uchar int vertex_indices
end_header
"
    .to_vec();
    for count in [3u8, 4, 2] {
        data.push(count);
        for i in 0..count as i32 {
            data.extend_from_slice(&i.to_le_bytes());
        }
    }

    let mut ply = open(&data);
    ply.add_descriptor(
        Descriptor::new("face", &["vertex_indices"], ScalarType::I32).with_list_size_hint(3),
    )
    .unwrap();
    assert!(matches!(
        ply.read(),
        Err(PlyError::ListSizeMismatch { expected: 3, found: 4, .. })
    ));

    let mut ply = open(&data);
    let faces = ply
        .add_descriptor(Descriptor::new("face", &["vertex_indices"], ScalarType::I32))
        .unwrap();
    ply.read().unwrap();
    assert_eq!(
        ply.decoded(faces).unwrap().list_counts_as::<u8>().unwrap(),
        &[3, 4, 2]
    );
}

#[test]
fn test_missing_property_keeps_earlier_outputs() {
    let mut ply = open(CUBE);
    let vertices = ply
        .add_descriptor(Descriptor::new("vertex", &["x"], ScalarType::F32))
        .unwrap();
    ply.read().unwrap();

    ply.add_descriptor(Descriptor::new("vertex", &["w"], ScalarType::F32))
        .unwrap();
    let err = ply.read().unwrap_err();
    assert!(matches!(
        err,
        PlyError::PropertyNotFound { ref element, ref property }
            if element == "vertex" && property == "w"
    ));
    assert_eq!(
        ply.decoded(vertices).unwrap().as_slice::<f32>().unwrap(),
        &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn test_missing_element() {
    let mut ply = open(CUBE);
    ply.add_descriptor(Descriptor::new("edge", &["vertex1"], ScalarType::I32))
        .unwrap();
    let err = ply.read().unwrap_err();
    assert!(matches!(err, PlyError::ElementNotFound(ref e) if e == "edge"));
    assert_eq!(
        error_message(err.code()),
        "Could not find requested element in the input ply file."
    );
}

#[test]
fn test_no_requests_leaves_stream_untouched() {
    let mut ply = open(CUBE);
    assert!(matches!(ply.read(), Err(PlyError::NoRequests)));
    assert_eq!(ply.into_inner().position(), 0);
}

#[test]
fn test_parse_header_is_idempotent() {
    let mut ply = open(CUBE);
    let first = ply.parse_header().unwrap().clone();
    let second = ply.parse_header().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(first.elements.len(), 2);

    let faces = ply
        .add_descriptor(Descriptor::new("face", &["vertex_index"], ScalarType::I32))
        .unwrap();
    ply.read().unwrap();
    assert_eq!(ply.header(), &first);
    assert_eq!(ply.decoded(faces).unwrap().as_slice::<i32>().unwrap().len(), 24);
}

#[test]
fn test_introspection() {
    let mut ply = open(CUBE);
    ply.parse_header().unwrap();

    assert!(ply.has_properties(&Descriptor::new("vertex", &["z", "x"], ScalarType::F32)));
    assert!(!ply.has_properties(&Descriptor::new("vertex", &["x", "nx"], ScalarType::F32)));
    assert!(!ply.has_properties(&Descriptor::new("edge", &["x"], ScalarType::F32)));

    assert_eq!(ply.find_element("face").unwrap().count, 6);
    assert!(ply.find_element("edge").is_none());
    let property = ply.find_property("face", "vertex_index").unwrap();
    assert!(property.is_list());
    assert_eq!(property.list_byte_size(), 1);
    assert_eq!(property.byte_size(), 4);
    assert!(ply.find_property("vertex", "vertex_index").is_none());
}

#[test]
fn test_malformed_headers() {
    let cases: [(&str, fn(&PlyError) -> bool); 4] = [
        ("solid cube\nend_header\n", |e| matches!(e, PlyError::InvalidFile)),
        ("ply\nformat binary_middle_endian 1.0\nend_header\n", |e| {
            matches!(e, PlyError::InvalidFormat(_))
        }),
        (
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty list float\nend_header\n",
            |e| matches!(e, PlyError::PropertyCmd(4)),
        ),
        ("ply\nformat ascii 1.0\nelement vertex 1\n", |e| {
            matches!(e, PlyError::HeaderEof)
        }),
    ];

    for (text, expected) in cases {
        let mut ply = open(text);
        let err = ply.parse_header().unwrap_err();
        assert!(expected(&err), "unexpected error {err:?} for {text:?}");
    }
}

#[test]
fn test_unrequested_trailing_element_is_not_scanned() {
    let faces_start = CUBE.find("4 0 1 2 3").unwrap();
    let data = format!("{}extra data that is not a face\n", &CUBE[..faces_start]);
    let truncated = data.replace("element face 6", "element face 600");
    let mut ply = open(truncated);
    let vertices = ply
        .add_descriptor(Descriptor::new("vertex", &["y"], ScalarType::I8))
        .unwrap();
    ply.read().unwrap();
    assert_eq!(
        ply.decoded(vertices).unwrap().as_slice::<i8>().unwrap(),
        &[0, 0, 1, 1, 0, 0, 1, 1]
    );
}

#[test]
fn test_short_binary_element() {
    let mut data = binary_vertices();
    data.truncate(data.len() - 5);
    let mut ply = open(data);
    ply.add_descriptor(Descriptor::new("vertex", &["x"], ScalarType::F32))
        .unwrap();
    assert!(matches!(ply.read(), Err(PlyError::BinaryParse(ref e)) if e == "vertex"));
}

#[test]
fn test_oversized_float_list_count() {
    let mut data =
        b"ply\nformat binary_little_endian 1.0\nelement face 1\nproperty list float int idx\nend_header\n"
            .to_vec();
    data.extend_from_slice(&1e30f32.to_le_bytes());
    data.extend_from_slice(&[0u8; 8]);

    let mut ply = open(data);
    ply.add_descriptor(Descriptor::new("face", &["idx"], ScalarType::I32))
        .unwrap();
    assert!(matches!(ply.read(), Err(PlyError::InvalidListCount(_))));
}

#[test]
fn test_record_count_larger_than_stream() {
    for count in ["4611686018427387904", "1099511627776"] {
        let mut data = format!(
            "ply\nformat binary_little_endian 1.0\nelement vertex {count}\nproperty float x\nend_header\n"
        )
        .into_bytes();
        data.extend_from_slice(&[0u8; 8]);

        let mut ply = open(data);
        ply.add_descriptor(Descriptor::new("vertex", &["x"], ScalarType::F32))
            .unwrap();
        assert!(matches!(ply.read(), Err(PlyError::BinaryParse(ref e)) if e == "vertex"));
    }
}
