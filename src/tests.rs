#[cfg(test)]
mod tests {
    use crate::boxes::cmpd::component_type;
    use crate::compression::{COMPRESSION_DEFLATE, COMPRESSION_ZLIB};
    use crate::{
        bayer_bilinear_to_rgb, read_box, BayerPattern, BayerPatternPixel, BoxWriter, Channel,
        ChromaFormat, Cloc, CmpC, Colorspace, Component, ComponentFormat,
        ComponentInterleaveEncoder, EncodingOptions, ErrorKind, Icef, InterleaveType, FourCC,
        PixelImage, PolarizationPattern, SamplingType, Sbpm, SecurityLimits, SensorBadPixelsMap,
        SensorNonUniformityCorrection, Snuc, Splz, UncBox, UncC, UncCComponent, UncDecoder,
        UncError,
    };

    fn written<F>(write: F) -> Vec<u8>
    where
        F: FnOnce(&mut BoxWriter) -> Result<(), UncError>,
    {
        let mut w = BoxWriter::new();
        write(&mut w).unwrap();
        w.into_bytes().unwrap()
    }

    fn parse_one(bytes: &[u8], limits: &SecurityLimits) -> UncBox {
        let (parsed, consumed) = read_box(bytes, limits).unwrap();
        assert_eq!(consumed, bytes.len());
        parsed
    }

    /// Serializing a parsed box must reproduce the input bytes.
    fn assert_reserializes(bytes: &[u8], limits: &SecurityLimits) {
        let parsed = parse_one(bytes, limits);
        let rewritten = written(|w| parsed.write(w));
        assert_eq!(rewritten, bytes);
    }

    // --- cmpd

    #[test]
    fn cmpd_single_component() {
        let mut cmpd = crate::Cmpd::new();
        assert_eq!(cmpd.components().len(), 0);
        cmpd.add_component(Component {
            component_type: 1,
            component_type_uri: String::new(),
        });
        assert_eq!(cmpd.components().len(), 1);
        assert_eq!(cmpd.components()[0].component_type, 1);
        assert_eq!(cmpd.components()[0].component_type_uri, "");
        assert_eq!(cmpd.components()[0].component_type_name(), "Y");

        let bytes = written(|w| cmpd.write(w));
        let expected = [
            0x00, 0x00, 0x00, 0x0e, b'c', b'm', b'p', b'd', 0x00, 0x00, 0x00, 0x01, 0x00, 0x01,
        ];
        assert_eq!(bytes, expected);

        assert_eq!(
            cmpd.dump(0),
            "Box: cmpd -----\nsize: 0   (header size: 0)\ncomponent_type: Y\n"
        );

        assert_reserializes(&bytes, &SecurityLimits::default());
    }

    #[test]
    fn cmpd_rgb() {
        let mut cmpd = crate::Cmpd::new();
        for ty in [4u16, 5, 6] {
            cmpd.add_component(Component {
                component_type: ty,
                component_type_uri: String::new(),
            });
        }
        assert_eq!(cmpd.components().len(), 3);
        assert_eq!(cmpd.components()[0].component_type_name(), "red");
        assert_eq!(cmpd.components()[1].component_type_name(), "green");
        assert_eq!(cmpd.components()[2].component_type_name(), "blue");

        let bytes = written(|w| cmpd.write(w));
        let expected = [
            0x00, 0x00, 0x00, 0x12, b'c', b'm', b'p', b'd', 0x00, 0x00, 0x00, 0x03, 0x00, 0x04,
            0x00, 0x05, 0x00, 0x06,
        ];
        assert_eq!(bytes, expected);

        assert_eq!(
            cmpd.dump(0),
            "Box: cmpd -----\nsize: 0   (header size: 0)\n\
             component_type: red\ncomponent_type: green\ncomponent_type: blue\n"
        );
    }

    #[test]
    fn cmpd_custom_types() {
        let mut cmpd = crate::Cmpd::new();
        cmpd.add_component(Component {
            component_type: 0x8000,
            component_type_uri: "http://example.com/custom_component_uri".into(),
        });
        cmpd.add_component(Component {
            component_type: 0x8002,
            component_type_uri: "http://example.com/another_custom_component_uri".into(),
        });
        assert_eq!(cmpd.components()[0].component_type_name(), "0x8000");
        assert_eq!(cmpd.components()[1].component_type_name(), "0x8002");

        let bytes = written(|w| cmpd.write(w));
        let mut expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x68, b'c', b'm', b'p', b'd', 0x00, 0x00, 0x00, 0x02,
        ];
        expected.extend_from_slice(&[0x80, 0x00]);
        expected.extend_from_slice(b"http://example.com/custom_component_uri\0");
        expected.extend_from_slice(&[0x80, 0x02]);
        expected.extend_from_slice(b"http://example.com/another_custom_component_uri\0");
        assert_eq!(bytes, expected);

        assert_eq!(
            cmpd.dump(0),
            "Box: cmpd -----\nsize: 0   (header size: 0)\n\
             component_type: 0x8000\n\
             | component_type_uri: http://example.com/custom_component_uri\n\
             component_type: 0x8002\n\
             | component_type_uri: http://example.com/another_custom_component_uri\n"
        );

        assert_reserializes(&bytes, &SecurityLimits::default());
    }

    #[test]
    fn cmpd_custom_type_without_uri_is_rejected() {
        // Custom type 0x8000 followed by an immediate NUL terminator.
        let bytes = [
            0x00, 0x00, 0x00, 0x0f, b'c', b'm', b'p', b'd', 0x00, 0x00, 0x00, 0x01, 0x80, 0x00,
            0x00,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // --- uncC

    const UNCC_RGBA_BYTES: [u8; 64] = [
        0x00, 0x00, 0x00, 0x40, b'u', b'n', b'c', b'C', 0x00, 0x00, 0x00, 0x00, b'r', b'g', b'b',
        b'a', 0x00, 0x00, 0x00, 0x04, 0, 0, 7, 0x00, 0x00, 0x00, 0x01, 0x07, 0x00, 0x00, 0x00,
        0x02, 0x07, 0x00, 0x00, 0x00, 0x03, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];

    fn rgba_uncc() -> UncC {
        let mut uncc = UncC::new();
        uncc.profile = FourCC::new(b"rgba");
        for index in 0..4u16 {
            uncc.add_component(UncCComponent {
                component_index: index,
                component_bit_depth: 8,
                component_format: ComponentFormat::Unsigned,
                component_align_size: 0,
            });
        }
        uncc.sampling_type = SamplingType::NoSubsampling;
        uncc.interleave_type = InterleaveType::Pixel;
        uncc
    }

    const UNCC_DUMP_BODY: &str = "profile: 1919378017 (rgba)\n\
         component_index: 0\n\
         | component_bit_depth: 8\n\
         | component_format: unsigned\n\
         | component_align_size: 0\n\
         component_index: 1\n\
         | component_bit_depth: 8\n\
         | component_format: unsigned\n\
         | component_align_size: 0\n\
         component_index: 2\n\
         | component_bit_depth: 8\n\
         | component_format: unsigned\n\
         | component_align_size: 0\n\
         component_index: 3\n\
         | component_bit_depth: 8\n\
         | component_format: unsigned\n\
         | component_align_size: 0\n\
         sampling_type: no subsampling\n\
         interleave_type: pixel\n\
         block_size: 0\n\
         components_little_endian: 0\n\
         block_pad_lsb: 0\n\
         block_little_endian: 0\n\
         block_reversed: 0\n\
         pad_unknown: 0\n\
         pixel_size: 0\n\
         row_align_size: 0\n\
         tile_align_size: 0\n";

    #[test]
    fn uncc_rgba_write_and_dump() {
        let uncc = rgba_uncc();
        assert_eq!(uncc.components.len(), 4);
        assert_eq!(uncc.block_size, 0);
        assert!(!uncc.components_little_endian);
        assert!(!uncc.block_pad_lsb);
        assert!(!uncc.block_little_endian);
        assert!(!uncc.pad_unknown);
        assert_eq!(uncc.pixel_size, 0);
        assert_eq!(uncc.row_align_size, 0);
        assert_eq!(uncc.tile_align_size, 0);
        assert_eq!(uncc.num_tile_cols, 1);
        assert_eq!(uncc.num_tile_rows, 1);

        let bytes = written(|w| uncc.write(w));
        assert_eq!(bytes, UNCC_RGBA_BYTES);

        let expected_dump = format!(
            "Box: uncC -----\nsize: 0   (header size: 0)\n{UNCC_DUMP_BODY}num_tile_cols: 1\nnum_tile_rows: 1\n"
        );
        assert_eq!(uncc.dump(0), expected_dump);
    }

    #[test]
    fn uncc_parse_tile_counts() {
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[56..].copy_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02]);

        let parsed = parse_one(&bytes, &SecurityLimits::default());
        let UncBox::UncC(uncc) = &parsed else {
            panic!("expected uncC, got {:?}", parsed.box_type());
        };
        assert_eq!(uncc.num_tile_cols, 2);
        assert_eq!(uncc.num_tile_rows, 3);

        let expected_dump = format!(
            "Box: uncC -----\nsize: 64   (header size: 12)\n{UNCC_DUMP_BODY}num_tile_cols: 2\nnum_tile_rows: 3\n"
        );
        assert_eq!(parsed.dump(0), expected_dump);

        assert_reserializes(&bytes, &SecurityLimits::default());
    }

    #[test]
    fn uncc_parse_max_tile_counts_without_limits() {
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[56..].copy_from_slice(&[0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xff, 0xfe]);

        let parsed = parse_one(&bytes, &SecurityLimits::disabled());
        let UncBox::UncC(uncc) = parsed else {
            panic!("expected uncC");
        };
        assert_eq!(uncc.num_tile_cols, 4294967295);
        assert_eq!(uncc.num_tile_rows, 4294967295);
    }

    #[test]
    fn uncc_parse_excess_tile_cols() {
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[56..].copy_from_slice(&[0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x7f, 0xff]);

        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(matches!(err, UncError::InvalidParameterValue(_)));
    }

    #[test]
    fn uncc_parse_excess_tile_rows() {
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[56..].copy_from_slice(&[0x00, 0x00, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff]);

        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(matches!(err, UncError::InvalidParameterValue(_)));
    }

    #[test]
    fn uncc_tile_grid_over_pixel_limit_is_rejected() {
        // 0x8000 x 0x10000 tiles parse fine without limits but exceed
        // the default pixel cap.
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[56..].copy_from_slice(&[0x00, 0x00, 0x7f, 0xff, 0x00, 0x00, 0xff, 0xff]);

        assert!(read_box(&bytes, &SecurityLimits::disabled()).is_ok());
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert!(matches!(err, UncError::InvalidParameterValue(_)));
    }

    // --- cmpC

    fn cmpc_case(bytes: &[u8], fourcc: &[u8; 4], unit_type: u8) {
        let limits = SecurityLimits::default();
        let parsed = parse_one(bytes, &limits);
        let UncBox::CmpC(cmpc) = &parsed else {
            panic!("expected cmpC");
        };
        assert_eq!(cmpc.compression_type, FourCC::new(fourcc));
        assert_eq!(cmpc.compressed_unit_type, unit_type);

        assert_reserializes(bytes, &limits);

        let fourcc_str = std::str::from_utf8(fourcc).unwrap();
        assert_eq!(
            parsed.dump(0),
            format!(
                "Box: cmpC -----\nsize: 17   (header size: 12)\n\
                 compression_type: {fourcc_str}\ncompressed_entity_type: {unit_type}\n"
            )
        );
    }

    #[test]
    fn cmpc_defl() {
        let bytes = [
            0x00, 0x00, 0x00, 0x11, b'c', b'm', b'p', b'C', 0x00, 0x00, 0x00, 0x00, b'd', b'e',
            b'f', b'l', 0x00,
        ];
        cmpc_case(&bytes, b"defl", 0);
    }

    #[test]
    fn cmpc_zlib() {
        let bytes = [
            0x00, 0x00, 0x00, 0x11, b'c', b'm', b'p', b'C', 0x00, 0x00, 0x00, 0x00, b'z', b'l',
            b'i', b'b', 0x02,
        ];
        cmpc_case(&bytes, b"zlib", 2);
    }

    #[test]
    fn cmpc_brot() {
        let bytes = [
            0x00, 0x00, 0x00, 0x11, b'c', b'm', b'p', b'C', 0x00, 0x00, 0x00, 0x00, b'b', b'r',
            b'o', b't', 0x01,
        ];
        cmpc_case(&bytes, b"brot", 1);
    }

    #[test]
    fn cmpc_bad_version() {
        let bytes = [
            0x00, 0x00, 0x00, 0x11, b'c', b'm', b'p', b'C', 0x01, 0x00, 0x00, 0x00, b'd', b'e',
            b'f', b'l', 0x00,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "cmpC box data version 1 is not implemented yet"
        );
    }

    #[test]
    fn uncc_bad_version() {
        let mut bytes = UNCC_RGBA_BYTES;
        bytes[8] = 0x01;
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "uncC box data version 1 is not implemented yet"
        );
    }

    // --- icef

    #[test]
    fn icef_24bit_offset_8bit_size() {
        let bytes = [
            0x00, 0x00, 0x00, 0x19, b'i', b'c', b'e', b'f', 0x00, 0x00, 0x00, 0x00, 0b0100_0000,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x0a, 0x03, 0x03, 0x02, 0x03, 0x0a, 0x07,
        ];
        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Icef(icef) = &parsed else {
            panic!("expected icef");
        };
        assert_eq!(icef.units().len(), 2);
        assert_eq!(icef.units()[0].unit_offset, 2563);
        assert_eq!(icef.units()[0].unit_size, 3);
        assert_eq!(icef.units()[1].unit_offset, 131850);
        assert_eq!(icef.units()[1].unit_size, 7);

        assert_reserializes(&bytes, &limits);

        assert_eq!(
            parsed.dump(0),
            "Box: icef -----\nsize: 25   (header size: 12)\nnum_compressed_units: 2\n\
             unit_offset: 2563, unit_size: 3\nunit_offset: 131850, unit_size: 7\n"
        );
    }

    #[test]
    fn icef_implied_offset_16bit_size() {
        let bytes = [
            0x00, 0x00, 0x00, 0x15, b'i', b'c', b'e', b'f', 0x00, 0x00, 0x00, 0x00, 0b0000_0100,
            0x00, 0x00, 0x00, 0x02, 0x40, 0x03, 0x0a, 0x07,
        ];
        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Icef(icef) = &parsed else {
            panic!("expected icef");
        };
        assert_eq!(icef.units().len(), 2);
        assert_eq!(icef.units()[0].unit_offset, 0);
        assert_eq!(icef.units()[0].unit_size, 16387);
        assert_eq!(icef.units()[1].unit_offset, 16387);
        assert_eq!(icef.units()[1].unit_size, 2567);

        assert_reserializes(&bytes, &limits);

        assert_eq!(
            parsed.dump(0),
            "Box: icef -----\nsize: 21   (header size: 12)\nnum_compressed_units: 2\n\
             unit_offset: 0, unit_size: 16387\nunit_offset: 16387, unit_size: 2567\n"
        );
    }

    #[test]
    fn icef_32bit_fields() {
        let bytes = [
            0x00, 0x00, 0x00, 0x21, b'i', b'c', b'e', b'f', 0x00, 0x00, 0x00, 0x00, 0b0110_1100,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x03, 0x04, 0x01, 0x01, 0x02, 0x03, 0x01, 0x02,
            0x03, 0x0a, 0x00, 0x04, 0x05, 0x07,
        ];
        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Icef(icef) = &parsed else {
            panic!("expected icef");
        };
        assert_eq!(icef.units()[0].unit_offset, 772);
        assert_eq!(icef.units()[0].unit_size, 16843267);
        assert_eq!(icef.units()[1].unit_offset, 16909066);
        assert_eq!(icef.units()[1].unit_size, 263431);

        assert_reserializes(&bytes, &limits);

        assert_eq!(
            parsed.dump(0),
            "Box: icef -----\nsize: 33   (header size: 12)\nnum_compressed_units: 2\n\
             unit_offset: 772, unit_size: 16843267\nunit_offset: 16909066, unit_size: 263431\n"
        );
    }

    #[test]
    fn icef_64bit_fields() {
        let bytes = [
            0x00, 0x00, 0x00, 0x31, b'i', b'c', b'e', b'f', 0x00, 0x00, 0x00, 0x00, 0b1001_0000,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x0a, 0x03, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x03, 0x0a,
            0x00, 0x00, 0x00, 0x03, 0x00, 0x04, 0x05, 0x07,
        ];
        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Icef(icef) = &parsed else {
            panic!("expected icef");
        };
        assert_eq!(icef.units()[0].unit_offset, 4294969859);
        assert_eq!(icef.units()[0].unit_size, 8590000643);
        assert_eq!(icef.units()[1].unit_offset, 8590066442);
        assert_eq!(icef.units()[1].unit_size, 12885165319);

        assert_reserializes(&bytes, &limits);

        assert_eq!(
            parsed.dump(0),
            "Box: icef -----\nsize: 49   (header size: 12)\nnum_compressed_units: 2\n\
             unit_offset: 4294969859, unit_size: 8590000643\n\
             unit_offset: 8590066442, unit_size: 12885165319\n"
        );
    }

    #[test]
    fn icef_bad_version() {
        let bytes = [
            0x00, 0x00, 0x00, 0x19, b'i', b'c', b'e', b'f', 0x01, 0x00, 0x00, 0x00, 0b0100_0000,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x0a, 0x03, 0x03, 0x02, 0x03, 0x0a, 0x07,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "icef box data version 1 is not implemented yet"
        );
    }

    #[test]
    fn icef_unit_count_over_limit() {
        let limits = SecurityLimits {
            max_icef_units: Some(1),
            ..SecurityLimits::default()
        };
        let bytes = [
            0x00, 0x00, 0x00, 0x15, b'i', b'c', b'e', b'f', 0x00, 0x00, 0x00, 0x00, 0b0000_0100,
            0x00, 0x00, 0x00, 0x02, 0x40, 0x03, 0x0a, 0x07,
        ];
        let err = read_box(&bytes, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // --- cloc

    #[test]
    fn cloc_round_trip_and_dump() {
        let mut cloc = Cloc::new();
        cloc.set_chroma_location(2);
        assert_eq!(cloc.chroma_location(), 2);

        let bytes = written(|w| cloc.write(w));
        let expected = [
            0x00, 0x00, 0x00, 0x0d, b'c', b'l', b'o', b'c', 0x00, 0x00, 0x00, 0x00, 0x02,
        ];
        assert_eq!(bytes, expected);

        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Cloc(parsed_cloc) = &parsed else {
            panic!("expected cloc");
        };
        assert_eq!(parsed_cloc.chroma_location(), 2);

        assert_eq!(
            parsed.dump(0),
            "Box: cloc -----\nsize: 13   (header size: 12)\nversion: 0\nflags: 0\n\
             chroma_location: 2 (h=0,   v=0)\n"
        );

        assert_reserializes(&bytes, &limits);
    }

    #[test]
    fn cloc_bad_version() {
        let bytes = [
            0x00, 0x00, 0x00, 0x0d, b'c', b'l', b'o', b'c', 0x01, 0x00, 0x00, 0x00, 0x02,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "cloc box data version 1 is not implemented yet"
        );
    }

    #[test]
    fn cloc_out_of_range() {
        let bytes = [
            0x00, 0x00, 0x00, 0x0d, b'c', b'l', b'o', b'c', 0x00, 0x00, 0x00, 0x00, 0x07,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(matches!(err, UncError::InvalidParameterValue(_)));
    }

    // --- splz

    #[test]
    fn splz_round_trip_and_dump() {
        let mut splz = Splz::new();
        splz.set_pattern(PolarizationPattern {
            component_indices: vec![0, 1],
            pattern_width: 2,
            pattern_height: 1,
            polarization_angles: vec![45.0, 90.0],
        });

        let bytes = written(|w| splz.write(w));
        let expected = [
            0x00, 0x00, 0x00, 0x24, b's', b'p', b'l', b'z', 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01,
            0x42, 0x34, 0x00, 0x00, 0x42, 0xb4, 0x00, 0x00,
        ];
        assert_eq!(bytes, expected);

        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Splz(parsed_splz) = &parsed else {
            panic!("expected splz");
        };
        let p = parsed_splz.pattern();
        assert_eq!(p.component_indices, vec![0, 1]);
        assert_eq!(p.pattern_width, 2);
        assert_eq!(p.pattern_height, 1);
        assert_eq!(p.polarization_angles, vec![45.0, 90.0]);

        assert_eq!(
            parsed.dump(0),
            "Box: splz -----\n\
             size: 36   (header size: 12)\n\
             version: 0\n\
             flags: 0\n\
             component_count: 2\n\
             \x20 component_index[0]: 0\n\
             \x20 component_index[1]: 1\n\
             pattern_width: 2\n\
             pattern_height: 1\n\
             \x20 [0,0]: 45 degrees\n\
             \x20 [1,0]: 90 degrees\n"
        );

        assert_reserializes(&bytes, &limits);
    }

    #[test]
    fn splz_no_filter_round_trips_bit_exact() {
        let mut splz = Splz::new();
        splz.set_pattern(PolarizationPattern {
            component_indices: vec![],
            pattern_width: 2,
            pattern_height: 1,
            polarization_angles: vec![crate::no_filter_value(), 0.0],
        });
        let bytes = written(|w| splz.write(w));
        let parsed = parse_one(&bytes, &SecurityLimits::default());
        let UncBox::Splz(parsed_splz) = parsed else {
            panic!("expected splz");
        };
        assert!(crate::is_no_filter(
            parsed_splz.pattern().polarization_angles[0]
        ));
        assert!(!crate::is_no_filter(
            parsed_splz.pattern().polarization_angles[1]
        ));
    }

    #[test]
    fn splz_bad_version() {
        let bytes = [
            0x00, 0x00, 0x00, 0x24, b's', b'p', b'l', b'z', 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01,
            0x42, 0x34, 0x00, 0x00, 0x42, 0xb4, 0x00, 0x00,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "splz box data version 1 is not implemented yet"
        );
    }

    // --- snuc

    #[test]
    fn snuc_round_trip_and_dump() {
        let mut snuc = Snuc::new();
        snuc.set_nuc(SensorNonUniformityCorrection {
            component_indices: vec![0],
            nuc_is_applied: true,
            image_width: 2,
            image_height: 1,
            nuc_gains: vec![1.0, 2.0],
            nuc_offsets: vec![0.0, 3.0],
        });

        let bytes = written(|w| snuc.write(w));
        let expected = [
            0x00, 0x00, 0x00, 0x2d, b's', b'n', b'u', b'c', 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
            0x01, 0x3f, 0x80, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40,
            0x40, 0x00, 0x00,
        ];
        assert_eq!(bytes, expected);

        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Snuc(parsed_snuc) = &parsed else {
            panic!("expected snuc");
        };
        let n = parsed_snuc.nuc();
        assert_eq!(n.component_indices, vec![0]);
        assert!(n.nuc_is_applied);
        assert_eq!(n.image_width, 2);
        assert_eq!(n.image_height, 1);
        assert_eq!(n.nuc_gains, vec![1.0, 2.0]);
        assert_eq!(n.nuc_offsets, vec![0.0, 3.0]);

        assert_eq!(
            parsed.dump(0),
            "Box: snuc -----\n\
             size: 45   (header size: 12)\n\
             version: 0\n\
             flags: 0\n\
             component_count: 1\n\
             \x20 component_index[0]: 0\n\
             nuc_is_applied: 1\n\
             image_width: 2\n\
             image_height: 1\n\
             nuc_gains: 2 values\n\
             nuc_offsets: 2 values\n"
        );

        assert_reserializes(&bytes, &limits);
    }

    #[test]
    fn snuc_bad_version() {
        let bytes = [
            0x00, 0x00, 0x00, 0x2d, b's', b'n', b'u', b'c', 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
            0x01, 0x3f, 0x80, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40,
            0x40, 0x00, 0x00,
        ];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "snuc box data version 1 is not implemented yet"
        );
    }

    // --- sbpm

    #[test]
    fn sbpm_round_trips() {
        let mut sbpm = Sbpm::new();
        sbpm.set_bad_pixels_map(SensorBadPixelsMap {
            component_indices: vec![0, 2],
            correction_applied: true,
            bad_rows: vec![17],
            bad_columns: vec![3, 1021],
            bad_pixels: vec![crate::BadPixel { row: 5, column: 9 }],
        });

        let bytes = written(|w| sbpm.write(w));
        let limits = SecurityLimits::default();
        let parsed = parse_one(&bytes, &limits);
        let UncBox::Sbpm(parsed_sbpm) = &parsed else {
            panic!("expected sbpm");
        };
        let m = parsed_sbpm.bad_pixels_map();
        assert_eq!(m.component_indices, vec![0, 2]);
        assert!(m.correction_applied);
        assert_eq!(m.bad_rows, vec![17]);
        assert_eq!(m.bad_columns, vec![3, 1021]);
        assert_eq!(m.bad_pixels, vec![crate::BadPixel { row: 5, column: 9 }]);

        assert_reserializes(&bytes, &limits);
    }

    // --- box stream handling

    #[test]
    fn unknown_box_type_is_rejected() {
        let bytes = [0x00, 0x00, 0x00, 0x08, b'f', b'r', b'e', b'e'];
        let err = read_box(&bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn truncated_box_is_rejected() {
        // Declares 64 bytes but only 16 are present.
        let bytes = &UNCC_RGBA_BYTES[..16];
        let err = read_box(bytes, &SecurityLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn box_over_size_limit_is_rejected() {
        let limits = SecurityLimits {
            max_box_size_bytes: Some(32),
            ..SecurityLimits::default()
        };
        let err = read_box(&UNCC_RGBA_BYTES, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // --- encoder / decoder

    fn fill_plane_u8(img: &mut PixelImage, idx: usize, f: impl Fn(u32, u32) -> u8) {
        let width = img.plane_width(idx).unwrap();
        let height = img.plane_height(idx).unwrap();
        let (data, stride) = img.plane_data_mut(idx).unwrap();
        for y in 0..height {
            for x in 0..width {
                data[y as usize * stride + x as usize] = f(x, y);
            }
        }
    }

    fn fill_plane_u16(img: &mut PixelImage, idx: usize, f: impl Fn(u32, u32) -> u16) {
        let width = img.plane_width(idx).unwrap();
        let height = img.plane_height(idx).unwrap();
        let (data, stride) = img.plane_data_mut(idx).unwrap();
        for y in 0..height {
            for x in 0..width {
                let pos = y as usize * stride + 2 * x as usize;
                data[pos..pos + 2].copy_from_slice(&f(x, y).to_le_bytes());
            }
        }
    }

    fn rgb_image_8bpp(limits: &SecurityLimits) -> PixelImage {
        let mut img = PixelImage::new(4, 4, Colorspace::Rgb, ChromaFormat::C444);
        img.add_plane(Channel::R, 4, 4, 8, limits).unwrap();
        img.add_plane(Channel::G, 4, 4, 8, limits).unwrap();
        img.add_plane(Channel::B, 4, 4, 8, limits).unwrap();
        fill_plane_u8(&mut img, 0, |x, y| (16 * x + y) as u8);
        fill_plane_u8(&mut img, 1, |x, y| (100 + x + 16 * y) as u8);
        fill_plane_u8(&mut img, 2, |x, y| (200 + x * y) as u8);
        img
    }

    fn assert_planes_equal(a: &PixelImage, b: &PixelImage) {
        assert_eq!(a.plane_count(), b.plane_count());
        for idx in 0..a.plane_count() {
            assert_eq!(a.channel(idx).unwrap(), b.channel(idx).unwrap());
            assert_eq!(a.plane_width(idx).unwrap(), b.plane_width(idx).unwrap());
            assert_eq!(a.plane_height(idx).unwrap(), b.plane_height(idx).unwrap());
            assert_eq!(
                a.bits_per_pixel(idx).unwrap(),
                b.bits_per_pixel(idx).unwrap()
            );
            assert_eq!(a.plane_data(idx).unwrap(), b.plane_data(idx).unwrap());
        }
    }

    #[test]
    fn tile_size_law_byte_aligned_and_bit_packed() {
        let limits = SecurityLimits::default();
        let options = EncodingOptions::default();

        // Monochrome 8 bpp.
        let mut mono = PixelImage::new(7, 3, Colorspace::Monochrome, ChromaFormat::Monochrome);
        mono.add_plane(Channel::Y, 7, 3, 8, &limits).unwrap();
        let enc = ComponentInterleaveEncoder::new(&mono, &options).unwrap();
        assert_eq!(enc.compute_tile_data_size_bytes(7, 3), 21);
        assert_eq!(enc.encode_tile(&mono).unwrap().len(), 21);

        // RGB 4:4:4 8 bpp.
        let rgb = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&rgb, &options).unwrap();
        assert_eq!(enc.compute_tile_data_size_bytes(4, 4), 48);
        assert_eq!(enc.encode_tile(&rgb).unwrap().len(), 48);

        // YCbCr 4:2:0 8 bpp, odd luma dimensions round up.
        let mut ycbcr = PixelImage::new(5, 3, Colorspace::YCbCr, ChromaFormat::C420);
        ycbcr.add_plane(Channel::Y, 5, 3, 8, &limits).unwrap();
        ycbcr.add_plane(Channel::Cb, 3, 2, 8, &limits).unwrap();
        ycbcr.add_plane(Channel::Cr, 3, 2, 8, &limits).unwrap();
        let enc = ComponentInterleaveEncoder::new(&ycbcr, &options).unwrap();
        assert_eq!(enc.compute_tile_data_size_bytes(5, 3), 15 + 6 + 6);
        assert_eq!(enc.encode_tile(&ycbcr).unwrap().len(), 27);

        // YCbCr 4:2:2 16 bpp.
        let mut ycbcr422 = PixelImage::new(4, 2, Colorspace::YCbCr, ChromaFormat::C422);
        ycbcr422.add_plane(Channel::Y, 4, 2, 16, &limits).unwrap();
        ycbcr422.add_plane(Channel::Cb, 2, 2, 16, &limits).unwrap();
        ycbcr422.add_plane(Channel::Cr, 2, 2, 16, &limits).unwrap();
        let enc = ComponentInterleaveEncoder::new(&ycbcr422, &options).unwrap();
        assert_eq!(enc.compute_tile_data_size_bytes(4, 2), 16 + 8 + 8);
        assert_eq!(enc.encode_tile(&ycbcr422).unwrap().len(), 32);

        // Bit-packed 12 bpp monochrome: ceil(5*12/8) = 8 bytes per row.
        let mut packed = PixelImage::new(5, 3, Colorspace::Monochrome, ChromaFormat::Monochrome);
        packed.add_plane(Channel::Y, 5, 3, 12, &limits).unwrap();
        let enc = ComponentInterleaveEncoder::new(&packed, &options).unwrap();
        assert_eq!(enc.compute_tile_data_size_bytes(5, 3), 24);
        assert_eq!(enc.encode_tile(&packed).unwrap().len(), 24);
    }

    #[test]
    fn bit_packed_rows_are_independent() {
        let limits = SecurityLimits::default();
        let options = EncodingOptions::default();

        let mut a = PixelImage::new(5, 2, Colorspace::Monochrome, ChromaFormat::Monochrome);
        a.add_plane(Channel::Y, 5, 2, 12, &limits).unwrap();
        fill_plane_u16(&mut a, 0, |x, y| (100 * y + x) as u16);

        let mut b = a.clone();
        // Change only row 1.
        fill_plane_u16(&mut b, 0, |x, y| if y == 1 { 4095 } else { (100 * y + x) as u16 });

        let enc = ComponentInterleaveEncoder::new(&a, &options).unwrap();
        let coded_a = enc.encode_tile(&a).unwrap();
        let coded_b = enc.encode_tile(&b).unwrap();

        let row_bytes = (5 * 12 + 7) / 8;
        assert_eq!(coded_a[..row_bytes], coded_b[..row_bytes]);
        assert_ne!(coded_a[row_bytes..], coded_b[row_bytes..]);
    }

    #[test]
    fn bit_packed_row_flush_pads_lsbs() {
        let limits = SecurityLimits::default();
        let options = EncodingOptions::default();

        // One 4-bit sample per row: each row flushes to one byte with
        // the sample left-justified.
        let mut img = PixelImage::new(1, 2, Colorspace::Monochrome, ChromaFormat::Monochrome);
        img.add_plane(Channel::Y, 1, 2, 4, &limits).unwrap();
        fill_plane_u8(&mut img, 0, |_, y| if y == 0 { 0x0f } else { 0x05 });

        let enc = ComponentInterleaveEncoder::new(&img, &options).unwrap();
        let coded = enc.encode_tile(&img).unwrap();
        assert_eq!(coded, vec![0xf0, 0x50]);
    }

    #[test]
    fn encode_decode_rgb_8bpp() {
        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();

        assert_eq!(enc.uncc().interleave_type, InterleaveType::Component);
        assert!(!enc.uncc().components_little_endian);
        let types: Vec<u16> = enc
            .cmpd()
            .components()
            .iter()
            .map(|c| c.component_type)
            .collect();
        assert_eq!(
            types,
            vec![
                component_type::RED,
                component_type::GREEN,
                component_type::BLUE
            ]
        );

        let tile = enc.encode_tile(&img).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();

        assert_eq!(decoded.colorspace(), Colorspace::Rgb);
        assert_eq!(decoded.chroma_format(), ChromaFormat::C444);
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn encode_decode_monochrome_collapses_y() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(6, 4, Colorspace::Monochrome, ChromaFormat::Monochrome);
        img.add_plane(Channel::Y, 6, 4, 8, &limits).unwrap();
        fill_plane_u8(&mut img, 0, |x, y| (x * 40 + y) as u8);

        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        // Y without Cb collapses to the monochrome component type.
        assert_eq!(
            enc.cmpd().components()[0].component_type,
            component_type::MONOCHROME
        );

        let tile = enc.encode_tile(&img).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 6, 4);
        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();
        assert_eq!(decoded.colorspace(), Colorspace::Monochrome);
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn encode_decode_ycbcr_420() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(4, 4, Colorspace::YCbCr, ChromaFormat::C420);
        img.add_plane(Channel::Y, 4, 4, 8, &limits).unwrap();
        img.add_plane(Channel::Cb, 2, 2, 8, &limits).unwrap();
        img.add_plane(Channel::Cr, 2, 2, 8, &limits).unwrap();
        fill_plane_u8(&mut img, 0, |x, y| (x + 4 * y) as u8);
        fill_plane_u8(&mut img, 1, |x, y| (128 + x + 2 * y) as u8);
        fill_plane_u8(&mut img, 2, |x, y| (64 + 2 * x + y) as u8);

        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        assert_eq!(enc.uncc().sampling_type, SamplingType::YCbCr420);

        let tile = enc.encode_tile(&img).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();
        assert_eq!(decoded.colorspace(), Colorspace::YCbCr);
        assert_eq!(decoded.chroma_format(), ChromaFormat::C420);
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn encode_decode_16bpp_sets_little_endian() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(3, 2, Colorspace::Rgb, ChromaFormat::C444);
        img.add_plane(Channel::R, 3, 2, 16, &limits).unwrap();
        img.add_plane(Channel::G, 3, 2, 16, &limits).unwrap();
        img.add_plane(Channel::B, 3, 2, 16, &limits).unwrap();
        fill_plane_u16(&mut img, 0, |x, y| (1000 * x + y) as u16);
        fill_plane_u16(&mut img, 1, |x, y| (40000 + x + y) as u16);
        fill_plane_u16(&mut img, 2, |x, y| (513 * x * y) as u16);

        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        assert!(enc.uncc().components_little_endian);

        let tile = enc.encode_tile(&img).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 3, 2);
        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn encode_decode_bit_packed_12bpp() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(5, 3, Colorspace::Monochrome, ChromaFormat::Monochrome);
        img.add_plane(Channel::Y, 5, 3, 12, &limits).unwrap();
        fill_plane_u16(&mut img, 0, |x, y| (819 * x + 100 * y) as u16 & 0x0fff);

        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        let tile = enc.encode_tile(&img).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 5, 3);
        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn encode_decode_compressed_tiles() {
        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();

        for method in [COMPRESSION_DEFLATE, COMPRESSION_ZLIB] {
            let mut icef = Icef::new();
            let compressed = enc
                .encode_tile_compressed(&img, method, &mut icef)
                .unwrap();
            assert_eq!(icef.units().len(), 1);
            assert_eq!(icef.units()[0].unit_offset, 0);
            assert_eq!(icef.units()[0].unit_size, compressed.len() as u64);

            let mut decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
            decoder.set_cmpc(CmpC::new(method, 0));
            decoder.set_icef(icef);
            let decoded = decoder.decode_single_frame(&compressed, &limits).unwrap();
            assert_planes_equal(&img, &decoded);
        }
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn encode_decode_brotli_tile() {
        use crate::compression::COMPRESSION_BROTLI;

        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();

        let mut icef = Icef::new();
        let compressed = enc
            .encode_tile_compressed(&img, COMPRESSION_BROTLI, &mut icef)
            .unwrap();

        let mut decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
        decoder.set_cmpc(CmpC::new(COMPRESSION_BROTLI, 0));
        decoder.set_icef(icef);
        let decoded = decoder.decode_single_frame(&compressed, &limits).unwrap();
        assert_planes_equal(&img, &decoded);
    }

    #[test]
    fn compressed_tile_registration_accumulates_offsets() {
        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();

        let mut icef = Icef::new();
        let first = enc
            .encode_tile_compressed(&img, COMPRESSION_DEFLATE, &mut icef)
            .unwrap();
        let second = enc
            .encode_tile_compressed(&img, COMPRESSION_DEFLATE, &mut icef)
            .unwrap();

        assert_eq!(icef.units().len(), 2);
        assert_eq!(icef.units()[0].unit_offset, 0);
        assert_eq!(icef.units()[0].unit_size, first.len() as u64);
        assert_eq!(icef.units()[1].unit_offset, first.len() as u64);
        assert_eq!(icef.units()[1].unit_size, second.len() as u64);
    }

    #[test]
    fn interleaved_source_is_rejected() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(4, 4, Colorspace::Rgb, ChromaFormat::InterleavedRgb);
        img.add_plane(Channel::Interleaved, 4, 4, 8, &limits).unwrap();

        assert!(!ComponentInterleaveEncoder::can_encode(&img));
        let err = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn decoder_requires_mandatory_boxes() {
        let mut cmpd = crate::Cmpd::new();
        cmpd.add_component(Component {
            component_type: 0,
            component_type_uri: String::new(),
        });
        let err = UncDecoder::from_boxes(vec![UncBox::Cmpd(cmpd)], 4, 4).unwrap_err();
        assert!(matches!(err, UncError::NoMandatoryProperty(ref p) if p == "uncC"));

        let err = UncDecoder::from_boxes(vec![UncBox::UncC(rgba_uncc())], 4, 4).unwrap_err();
        assert!(matches!(err, UncError::NoMandatoryProperty(ref p) if p == "cmpd"));
    }

    #[test]
    fn decoder_rejects_unimplemented_interleave() {
        let limits = SecurityLimits::default();
        let mut cmpd = crate::Cmpd::new();
        for ty in [4u16, 5, 6, 7] {
            cmpd.add_component(Component {
                component_type: ty,
                component_type_uri: String::new(),
            });
        }
        let decoder = UncDecoder::new(rgba_uncc(), cmpd, 2, 2);
        let err = decoder.decode_single_frame(&[0u8; 16], &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn decoder_rejects_wrong_frame_size() {
        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        let decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);

        let err = decoder.decode_single_frame(&[0u8; 47], &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn decoder_rejects_out_of_range_component_index() {
        let limits = SecurityLimits::default();
        let mut cmpd = crate::Cmpd::new();
        cmpd.add_component(Component {
            component_type: 0,
            component_type_uri: String::new(),
        });
        let mut uncc = UncC::new();
        uncc.add_component(UncCComponent {
            component_index: 7,
            component_bit_depth: 8,
            component_format: ComponentFormat::Unsigned,
            component_align_size: 0,
        });
        let decoder = UncDecoder::new(uncc, cmpd, 2, 2);
        let err = decoder.decode_single_frame(&[0u8; 4], &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    // --- sensor metadata through the full pipeline

    fn filter_array_image(limits: &SecurityLimits) -> PixelImage {
        let mut img = PixelImage::new(4, 4, Colorspace::FilterArray, ChromaFormat::Monochrome);
        img.add_plane(Channel::FilterArray, 4, 4, 8, limits).unwrap();
        // RGGB pattern authored with raw component types.
        img.set_bayer_pattern(BayerPattern {
            pattern_width: 2,
            pattern_height: 2,
            pixels: vec![
                BayerPatternPixel {
                    component_index: component_type::RED,
                    component_gain: 1.0,
                },
                BayerPatternPixel {
                    component_index: component_type::GREEN,
                    component_gain: 1.0,
                },
                BayerPatternPixel {
                    component_index: component_type::GREEN,
                    component_gain: 1.0,
                },
                BayerPatternPixel {
                    component_index: component_type::BLUE,
                    component_gain: 1.0,
                },
            ],
        })
        .unwrap();
        img
    }

    #[test]
    fn bayer_pattern_resolves_to_reference_components() {
        let limits = SecurityLimits::default();
        let img = filter_array_image(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();

        // Data component plus reference components in first-appearance
        // order: filter array, then R, G, B.
        let types: Vec<u16> = enc
            .cmpd()
            .components()
            .iter()
            .map(|c| c.component_type)
            .collect();
        assert_eq!(
            types,
            vec![
                component_type::FILTER_ARRAY,
                component_type::RED,
                component_type::GREEN,
                component_type::BLUE
            ]
        );
        // Only the data component has a uncC entry.
        assert_eq!(enc.uncc().components.len(), 1);

        let cpat = enc.cpat().expect("encoder must emit cpat");
        let indices: Vec<u16> = cpat
            .pattern()
            .pixels
            .iter()
            .map(|p| p.component_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 2, 3]);
    }

    #[test]
    fn sensor_metadata_survives_encode_decode() {
        let limits = SecurityLimits::default();
        let mut img = filter_array_image(&limits);
        fill_plane_u8(&mut img, 0, |x, y| (x * 50 + y * 11) as u8);

        img.add_polarization_pattern(PolarizationPattern {
            component_indices: vec![0],
            pattern_width: 2,
            pattern_height: 1,
            polarization_angles: vec![45.0, crate::no_filter_value()],
        })
        .unwrap();
        img.add_sensor_bad_pixels_map(SensorBadPixelsMap {
            component_indices: vec![],
            correction_applied: false,
            bad_rows: vec![1],
            bad_columns: vec![2],
            bad_pixels: vec![crate::BadPixel { row: 3, column: 0 }],
        });
        img.add_sensor_nuc(SensorNonUniformityCorrection {
            component_indices: vec![0],
            nuc_is_applied: false,
            image_width: 4,
            image_height: 4,
            nuc_gains: vec![1.0; 16],
            nuc_offsets: vec![0.5; 16],
        })
        .unwrap();
        img.set_chroma_location(2).unwrap();

        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        assert_eq!(enc.splz().len(), 1);
        assert_eq!(enc.sbpm().len(), 1);
        assert_eq!(enc.snuc().len(), 1);
        assert!(enc.cloc().is_some());

        let tile = enc.encode_tile(&img).unwrap();

        let mut decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
        decoder.set_cpat(enc.cpat().unwrap().clone());
        decoder.set_splz(enc.splz().to_vec());
        decoder.set_sbpm(enc.sbpm().to_vec());
        decoder.set_snuc(enc.snuc().to_vec());
        decoder.set_cloc(enc.cloc().unwrap().clone());

        let decoded = decoder.decode_single_frame(&tile, &limits).unwrap();
        assert_eq!(decoded.colorspace(), Colorspace::FilterArray);
        assert_planes_equal(&img, &decoded);

        // The component table covers the reference components.
        assert_eq!(
            decoded.component_types(),
            &[
                component_type::FILTER_ARRAY,
                component_type::RED,
                component_type::GREEN,
                component_type::BLUE
            ]
        );

        let pattern = decoded.bayer_pattern().unwrap();
        assert_eq!(pattern.pattern_width, 2);
        let pattern_types: Vec<u16> = pattern
            .pixels
            .iter()
            .map(|p| decoded.component_type(p.component_index as usize).unwrap())
            .collect();
        assert_eq!(
            pattern_types,
            vec![
                component_type::RED,
                component_type::GREEN,
                component_type::GREEN,
                component_type::BLUE
            ]
        );

        let pol = &decoded.polarization_patterns()[0];
        assert_eq!(pol.component_indices, vec![0]);
        assert_eq!(pol.polarization_angles[0], 45.0);
        assert!(crate::is_no_filter(pol.polarization_angles[1]));

        assert_eq!(decoded.sensor_bad_pixels_maps(), img.sensor_bad_pixels_maps());
        assert_eq!(decoded.sensor_nucs(), img.sensor_nucs());
        assert_eq!(decoded.chroma_location(), Some(2));

        // The decoded image demosaics through the component table path.
        let rgb = bayer_bilinear_to_rgb(&decoded, &limits).unwrap();
        assert_eq!(rgb.colorspace(), Colorspace::Rgb);
        assert_eq!(rgb.chroma_format(), ChromaFormat::InterleavedRgb);
    }

    #[test]
    fn push_pull_sequence_frames() {
        let limits = SecurityLimits::default();
        let img = rgb_image_8bpp(&limits);
        let enc = ComponentInterleaveEncoder::new(&img, &EncodingOptions::default()).unwrap();
        let tile = enc.encode_tile(&img).unwrap();

        let mut decoder = UncDecoder::new(enc.uncc().clone(), enc.cmpd().clone(), 4, 4);
        assert!(decoder.pull_decoded_frame().is_none());

        decoder.push_frame_data(&tile, &limits).unwrap();
        decoder.flush();
        let frame = decoder.pull_decoded_frame().unwrap();
        assert_planes_equal(&img, &frame);
        assert!(decoder.pull_decoded_frame().is_none());
    }

    // --- demosaicing

    #[test]
    fn demosaic_flat_white_stays_white() {
        let limits = SecurityLimits::default();
        let mut img = filter_array_image(&limits);
        fill_plane_u8(&mut img, 0, |_, _| 255);

        let rgb = bayer_bilinear_to_rgb(&img, &limits).unwrap();
        assert_eq!(rgb.chroma_format(), ChromaFormat::InterleavedRgb);
        let (data, stride) = rgb.plane_data(0).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                for ch in 0..3 {
                    assert_eq!(
                        data[y * stride + 3 * x + ch],
                        255,
                        "channel {ch} at ({x},{y})"
                    );
                }
            }
        }
    }

    #[test]
    fn demosaic_constant_channels_average_exactly() {
        let limits = SecurityLimits::default();
        let mut img = filter_array_image(&limits);
        // RGGB: R positions carry 100, G positions 200, B positions 0.
        fill_plane_u8(&mut img, 0, |x, y| match (x % 2, y % 2) {
            (0, 0) => 100,
            (1, 1) => 0,
            _ => 200,
        });

        // Every contributing neighbor of a channel carries that
        // channel's constant value, so each output equals it exactly.
        let rgb = bayer_bilinear_to_rgb(&img, &limits).unwrap();
        let (data, stride) = rgb.plane_data(0).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(data[y * stride + 3 * x], 100, "red at ({x},{y})");
                assert_eq!(data[y * stride + 3 * x + 1], 200, "green at ({x},{y})");
                assert_eq!(data[y * stride + 3 * x + 2], 0, "blue at ({x},{y})");
            }
        }
    }

    #[test]
    fn demosaic_12bpp_produces_16bit_interleave() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(4, 4, Colorspace::FilterArray, ChromaFormat::Monochrome);
        img.add_plane(Channel::FilterArray, 4, 4, 12, &limits).unwrap();
        img.set_bayer_pattern(filter_array_image(&limits).bayer_pattern().unwrap().clone())
            .unwrap();
        fill_plane_u16(&mut img, 0, |_, _| 600);

        let rgb = bayer_bilinear_to_rgb(&img, &limits).unwrap();
        assert_eq!(rgb.chroma_format(), ChromaFormat::InterleavedRrggbbLe);
        let (data, stride) = rgb.plane_data(0).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                for ch in 0..3 {
                    let pos = y * stride + 2 * (3 * x + ch);
                    let v = u16::from_le_bytes([data[pos], data[pos + 1]]);
                    assert_eq!(v, 600);
                }
            }
        }
    }

    #[test]
    fn demosaic_rejects_unknown_component_types() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(2, 2, Colorspace::FilterArray, ChromaFormat::Monochrome);
        img.add_plane(Channel::FilterArray, 2, 2, 8, &limits).unwrap();
        img.set_bayer_pattern(BayerPattern {
            pattern_width: 1,
            pattern_height: 1,
            pixels: vec![BayerPatternPixel {
                component_index: component_type::Y,
                component_gain: 1.0,
            }],
        })
        .unwrap();

        let err = bayer_bilinear_to_rgb(&img, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn demosaic_rejects_high_bit_depths() {
        let limits = SecurityLimits::default();
        let mut img = PixelImage::new(2, 2, Colorspace::FilterArray, ChromaFormat::Monochrome);
        img.add_plane(Channel::FilterArray, 2, 2, 24, &limits).unwrap();
        img.set_bayer_pattern(BayerPattern {
            pattern_width: 1,
            pattern_height: 1,
            pixels: vec![BayerPatternPixel {
                component_index: component_type::RED,
                component_gain: 1.0,
            }],
        })
        .unwrap();

        let err = bayer_bilinear_to_rgb(&img, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
