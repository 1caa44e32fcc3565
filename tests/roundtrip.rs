//! Writing PLY data and reading it back

use ply_codec::{
    DecodedBuffer, Descriptor, ElementDef, PlyError, PlyFile, PlyFormat, PlyHeader,
    PropertySchema, ScalarType,
};
use std::io::Cursor;

fn write(format: PlyFormat, descriptors: Vec<Descriptor>) -> Vec<u8> {
    let mut ply = PlyFile::from_writer(Vec::new(), format);
    for desc in descriptors {
        ply.add_descriptor(desc).unwrap();
    }
    ply.write().unwrap();
    ply.into_inner()
}

fn read(bytes: Vec<u8>, descriptors: Vec<Descriptor>) -> Vec<DecodedBuffer> {
    let mut ply = PlyFile::from_reader(Cursor::new(bytes));
    let ids: Vec<_> = descriptors
        .into_iter()
        .map(|desc| ply.add_descriptor(desc).unwrap())
        .collect();
    ply.read().unwrap();
    ids.into_iter()
        .map(|id| ply.take_decoded(id).unwrap())
        .collect()
}

fn mesh_descriptors() -> Vec<Descriptor> {
    vec![
        Descriptor::from_data(
            "vertex",
            &["x", "y", "z"],
            vec![1.0f32, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        ),
        Descriptor::from_data("face", &["vertex_indices"], vec![0i32, 1, 2, 0, 1, 2, 0, 2, 1])
            .with_list_counts(vec![3u8, 4, 2]),
    ]
}

fn mesh_requests() -> Vec<Descriptor> {
    vec![
        Descriptor::new("vertex", &["x", "y", "z"], ScalarType::F32),
        Descriptor::new("face", &["vertex_indices"], ScalarType::I32),
    ]
}

fn assert_mesh(decoded: &[DecodedBuffer]) {
    assert_eq!(decoded[0].count, 3);
    assert_eq!(
        decoded[0].as_slice::<f32>().unwrap(),
        &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
    );
    assert_eq!(decoded[1].count, 3);
    assert_eq!(
        decoded[1].as_slice::<i32>().unwrap(),
        &[0, 1, 2, 0, 1, 2, 0, 2, 1]
    );
    assert_eq!(decoded[1].list_counts_as::<u8>().unwrap(), &[3, 4, 2]);
}

#[test]
fn test_ascii_roundtrip() {
    let bytes = write(PlyFormat::Ascii, mesh_descriptors());
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("element face 3\nproperty list uchar int vertex_indices\n"));
    assert!(text.ends_with("end_header\n1 0 1 \n0 0 1 \n1 0 0 \n3 0 1 2 \n4 0 1 2 0 \n2 2 1 \n"));

    assert_mesh(&read(bytes, mesh_requests()));
}

#[test]
fn test_binary_roundtrip_both_byte_orders() {
    let native = write(PlyFormat::native(), mesh_descriptors());
    let little = write(PlyFormat::BinaryLittleEndian, mesh_descriptors());
    let big = write(PlyFormat::BinaryBigEndian, mesh_descriptors());

    assert!(String::from_utf8_lossy(&big).contains("format binary_big_endian 1.0\n"));
    assert_ne!(little, big);
    assert_eq!(little.len(), big.len());

    let from_native = read(native, mesh_requests());
    let from_little = read(little, mesh_requests());
    let from_big = read(big, mesh_requests());
    assert_mesh(&from_native);
    assert_eq!(from_little, from_big);
}

#[test]
fn test_colors_read_as_float() {
    let bytes = write(
        PlyFormat::native(),
        vec![Descriptor::from_data("vertex", &["red"], vec![255u8, 125, 125, 255])],
    );
    let decoded = read(
        bytes,
        vec![Descriptor::new("vertex", &["red"], ScalarType::F32)],
    );
    assert_eq!(
        decoded[0].as_slice::<f32>().unwrap(),
        &[255.0, 125.0, 125.0, 255.0]
    );
}

#[test]
fn test_hinted_lists_roundtrip() {
    let triangles = vec![0u32, 1, 2, 2, 3, 0];
    for format in [PlyFormat::Ascii, PlyFormat::BinaryBigEndian] {
        let bytes = write(
            format,
            vec![Descriptor::from_data("face", &["vertex_indices"], triangles.clone())
                .with_list_type(ScalarType::U8)
                .with_list_size_hint(3)],
        );
        let decoded = read(
            bytes,
            vec![Descriptor::new("face", &["vertex_indices"], ScalarType::U32)
                .with_list_size_hint(3)
                .with_list_type(ScalarType::U16)],
        );
        assert_eq!(decoded[0].count, 2);
        assert_eq!(decoded[0].as_slice::<u32>().unwrap(), triangles.as_slice());
        assert_eq!(decoded[0].list_counts_as::<u16>().unwrap(), &[3, 3]);
    }
}

#[test]
fn test_mixed_element_from_declaration() {
    let mut ply = PlyFile::from_writer(Vec::new(), PlyFormat::BinaryLittleEndian);
    let mut face = ElementDef::new("face", 2);
    face.add_property(PropertySchema::list("vertex_indices", ScalarType::U8, ScalarType::I32))
        .unwrap();
    face.add_property(PropertySchema::scalar("quality", ScalarType::I32))
        .unwrap();
    ply.declare_element(face).unwrap();
    ply.add_comment("written by the roundtrip tests");
    ply.add_obj_info("two faces");
    ply.add_descriptor(
        Descriptor::from_data("face", &["quality", "vertex_indices"], vec![9i32, 0, 1, 2, 8, 3, 4])
            .with_list_counts(vec![3u8, 2]),
    )
    .unwrap();
    ply.write().unwrap();
    let bytes = ply.into_inner();

    let mut ply = PlyFile::from_reader(Cursor::new(bytes));
    let header = ply.parse_header().unwrap();
    assert_eq!(header.comments, vec!["written by the roundtrip tests"]);
    assert_eq!(header.obj_info, vec!["two faces"]);

    let quality = ply
        .add_descriptor(Descriptor::new("face", &["quality"], ScalarType::I32))
        .unwrap();
    let indices = ply
        .add_descriptor(Descriptor::new("face", &["vertex_indices"], ScalarType::I32))
        .unwrap();
    ply.read().unwrap();
    assert_eq!(ply.decoded(quality).unwrap().as_slice::<i32>().unwrap(), &[9, 8]);
    assert_eq!(
        ply.decoded(indices).unwrap().as_slice::<i32>().unwrap(),
        &[0, 1, 2, 3, 4]
    );
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesh.ply");

    let mut ply = PlyFile::open(&path, "wb").unwrap();
    assert_eq!(ply.format(), ply.host_format());
    for desc in mesh_descriptors() {
        ply.add_descriptor(desc).unwrap();
    }
    ply.write().unwrap();
    ply.close();

    let mut ply = PlyFile::open(&path, "r").unwrap();
    let ids: Vec<_> = mesh_requests()
        .into_iter()
        .map(|desc| ply.add_descriptor(desc).unwrap())
        .collect();
    ply.read().unwrap();
    let decoded: Vec<_> = ids
        .into_iter()
        .map(|id| ply.take_decoded(id).unwrap())
        .collect();
    assert_mesh(&decoded);
}

#[test]
fn test_open_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = PlyFile::open(dir.path().join("missing.ply"), "r")
        .err()
        .unwrap();
    assert!(matches!(err, PlyError::FileOpen { .. }));
    assert_eq!(err.code(), 3);

    assert!(matches!(
        PlyFile::open(dir.path().join("mesh.ply"), "x"),
        Err(PlyError::InvalidFormat(_))
    ));
}

fn write_err(descriptors: Vec<Descriptor>) -> PlyError {
    let mut ply = PlyFile::from_writer(Vec::new(), PlyFormat::Ascii);
    for desc in descriptors {
        if let Err(err) = ply.add_descriptor(desc) {
            return err;
        }
    }
    let err = ply.write().unwrap_err();
    assert!(ply.into_inner().is_empty());
    err
}

#[test]
fn test_write_errors() {
    assert!(matches!(write_err(vec![]), PlyError::NoRequests));

    assert!(matches!(
        write_err(vec![
            Descriptor::from_data("vertex", &["x"], vec![0.0f32; 4]),
            Descriptor::from_data("vertex", &["y"], vec![0.0f32; 5]),
        ]),
        PlyError::ConflictingNumberOfElements { declared: 4, requested: 5, .. }
    ));

    assert!(matches!(
        write_err(vec![Descriptor::from_data("face", &["idx"], vec![0i32; 3])
            .with_list_counts(vec![3.0f64])]),
        PlyError::InvalidListType(ScalarType::F64)
    ));

    assert!(matches!(
        write_err(vec![Descriptor::from_data("face", &["idx"], vec![0i32; 3])
            .with_list_type(ScalarType::U8)]),
        PlyError::MissingListCounts(_)
    ));

    assert!(matches!(
        write_err(vec![Descriptor::from_data("face", &["idx"], vec![0i32; 300])
            .with_list_type(ScalarType::U8)
            .with_list_size_hint(300)]),
        PlyError::InvalidListCount(_)
    ));

    assert!(matches!(
        write_err(vec![Descriptor::from_data("vertex", &["x", "y", "z"], vec![0.0f32; 10])]),
        PlyError::BufferSizeMismatch { expected: 9, found: 10, .. }
    ));
}

#[test]
fn test_declared_property_must_be_written() {
    let mut ply = PlyFile::from_writer(Vec::new(), PlyFormat::Ascii);
    let mut vertex = ElementDef::new("vertex", 1);
    vertex.add_property(PropertySchema::scalar("x", ScalarType::F32)).unwrap();
    vertex.add_property(PropertySchema::scalar("y", ScalarType::F32)).unwrap();
    ply.declare_element(vertex).unwrap();
    ply.add_descriptor(Descriptor::from_data("vertex", &["x"], vec![1.0f32]))
        .unwrap();

    let err = ply.write().unwrap_err();
    assert!(matches!(
        err,
        PlyError::WriteRequiredPropertyMissing { ref property, .. } if property == "y"
    ));
}

#[test]
fn test_header_serializes_to_json() {
    let bytes = write(PlyFormat::Ascii, mesh_descriptors());
    let (header, _) = PlyHeader::parse(Cursor::new(bytes)).unwrap();

    let json = serde_json::to_value(&header).unwrap();
    assert_eq!(json["format"], "ascii");
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["elements"][0]["properties"][0]["data_type"], "float");
    assert_eq!(json["elements"][1]["properties"][0]["list_type"], "uchar");
    assert!(json["elements"][0]["properties"][0].get("list_type").is_none());

    let back: PlyHeader = serde_json::from_value(json).unwrap();
    assert_eq!(back, header);
}
