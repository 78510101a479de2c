// Licensed under the Apache-2.0 license

//! Tests for block address allocation.

mod test {
    use crate::config::BlockOptions;
    use crate::error::{Location, RegError};
    use crate::ir::{BlockMap, Entity};
    use serde_json::{json, Value};

    fn compile(raw: Value) -> Result<BlockMap, RegError> {
        BlockMap::from_raw(&raw, &BlockOptions::with_defaults())
    }

    fn offsets(block: &BlockMap) -> Vec<(&str, u64)> {
        block
            .entities
            .iter()
            .map(|e| (e.name(), e.offset()))
            .collect()
    }

    #[test]
    fn test_uart_ctrl() {
        let block = compile(json!({
            "name": "uart",
            "registers": [{
                "name": "CTRL",
                "desc": "control",
                "fields": [
                    {"name": "TX_EN", "bits": "0", "swaccess": "rw"},
                    {"name": "RX_EN", "bits": "1", "swaccess": "rw"},
                ]
            }]
        }))
        .unwrap();
        assert_eq!(block.regwidth, 32);
        assert_eq!(block.size, 4);
        let Some(Entity::Register(ctrl)) = block.get("CTRL") else {
            panic!("CTRL missing");
        };
        assert_eq!(ctrl.offset, 0);
        assert_eq!(ctrl.resval(), 0);
        assert_eq!(ctrl.fields.len(), 2);
        assert_eq!(ctrl.fields[0].bits.width(), 1);
        assert_eq!(ctrl.fields[1].bits.width(), 1);
        assert!(!ctrl.fields[0].bits.overlaps(&ctrl.fields[1].bits));
    }

    #[test]
    fn test_fifo_data_multireg() {
        let block = compile(json!({
            "name": "uart",
            "registers": [{"multireg": {
                "name": "FIFO_DATA",
                "count": 4,
                "stride": 4,
                "fields": [{"bits": "31:0"}],
            }}]
        }))
        .unwrap();
        assert_eq!(
            offsets(&block),
            [
                ("FIFO_DATA_0", 0),
                ("FIFO_DATA_1", 4),
                ("FIFO_DATA_2", 8),
                ("FIFO_DATA_3", 12),
            ]
        );
        assert_eq!(block.size, 16);
        // A lone unnamed field takes the template's name.
        for reg in block.registers() {
            assert_eq!(reg.fields[0].name, "FIFO_DATA");
        }
    }

    #[test]
    fn test_wide_stride_and_param_count() {
        let raw = json!({
            "name": "dma",
            "param_list": [{"name": "NumCh", "default": 2}],
            "registers": [
                {"multireg": {
                    "name": "CH_CFG",
                    "count": "NumCh",
                    "stride": 8,
                    "fields": [{"name": "EN", "bits": "0"}],
                }},
                {"name": "STATUS", "fields": [{"name": "BUSY", "bits": "0", "swaccess": "ro"}]},
            ]
        });
        let block = compile(raw.clone()).unwrap();
        assert_eq!(
            offsets(&block),
            [("CH_CFG_0", 0), ("CH_CFG_1", 8), ("STATUS", 16)]
        );

        let opts = BlockOptions::with_defaults().add_param("NumCh", 3);
        let block = BlockMap::from_raw(&raw, &opts).unwrap();
        assert_eq!(block.registers().count(), 4);
        assert_eq!(block.get("STATUS").unwrap().offset(), 24);
        assert_eq!(block.params.get("NumCh"), Some(3));
        assert_eq!(block.size, 32);
    }

    #[test]
    fn test_offsets_increase_and_align() {
        let block = compile(json!({
            "name": "mbox",
            "registers": [
                {"name": "CTRL", "fields": [{"name": "GO", "bits": "0"}]},
                {"name": "STATUS", "fields": [{"name": "DONE", "bits": "0"}]},
                {"window": {"name": "MSG", "items": 6, "swaccess": "wo"}},
                {"name": "INTR", "fields": [{"name": "PIN", "bits": "3:0", "auto_split": true}]},
            ]
        }))
        .unwrap();
        assert_eq!(
            offsets(&block),
            [("CTRL", 0), ("STATUS", 4), ("MSG", 32), ("INTR", 56)]
        );
        assert_eq!(block.size, 64);
        let word = block.word_bytes();
        for pair in block.entities.windows(2) {
            assert!(pair[0].offset() < pair[1].offset());
        }
        for e in &block.entities {
            assert_eq!(e.offset() % e.align(word), 0);
        }
        let Some(Entity::Register(intr)) = block.get("INTR") else {
            panic!("INTR missing");
        };
        assert_eq!(intr.fields.len(), 4);
    }

    #[test]
    fn test_explicit_offsets() {
        let block = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"name": "B", "offset": "0x10", "fields": [{"bits": "0"}]},
                {"window": {"name": "W", "items": 4, "offset": "0x20"}},
            ]
        }))
        .unwrap();
        assert_eq!(offsets(&block), [("A", 0), ("B", 0x10), ("W", 0x20)]);

        let err = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"name": "B", "offset": 6, "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Alignment { addr: 6, align: 4, .. }), "{err}");

        let err = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"name": "B", "fields": [{"bits": "0"}]},
                {"name": "C", "offset": 4, "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            RegError::AddressOverlap {
                loc: Location::block("b"),
                first: "B".into(),
                second: "C".into(),
            }
        );

        // Windows must sit on their own power-of-two boundary.
        let err = compile(json!({
            "name": "b",
            "registers": [{"window": {"name": "W", "items": 4, "offset": 8}}]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Alignment { align: 16, .. }), "{err}");
    }

    #[test]
    fn test_declared_size_bounds_layout() {
        let raw = |size: u64| {
            json!({
                "name": "b",
                "size": size,
                "registers": [
                    {"name": "A", "fields": [{"bits": "0"}]},
                    {"name": "B", "fields": [{"bits": "0"}]},
                    {"name": "C", "fields": [{"bits": "0"}]},
                ]
            })
        };
        assert_eq!(compile(raw(0x100)).unwrap().size, 0x100);
        assert_eq!(compile(raw(12)).unwrap().size, 12);
        let err = compile(raw(8)).unwrap_err();
        assert!(
            matches!(&err, RegError::AddressOverflow { name, offset: 8, .. } if name == "C"),
            "{err}"
        );
        assert!(matches!(compile(raw(10)), Err(RegError::Alignment { .. })));
    }

    #[test]
    fn test_directives() {
        let block = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"reserved": 2},
                {"name": "B", "fields": [{"bits": "0"}]},
                {"skipto": "0x40"},
                {"name": "C", "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap();
        assert_eq!(offsets(&block), [("A", 0), ("B", 12), ("C", 0x40)]);
        assert_eq!(block.size, 0x80);

        let err = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"name": "B", "fields": [{"bits": "0"}]},
                {"skipto": 4},
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");

        let err = compile(json!({
            "name": "b",
            "registers": [{"skipto": 4, "name": "A"}]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }

    #[test]
    fn test_duplicate_names_across_expansion() {
        let err = compile(json!({
            "name": "b",
            "registers": [
                {"multireg": {"name": "X", "count": 2, "fields": [{"bits": "0"}]}},
                {"name": "X_1", "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap_err();
        assert!(
            matches!(&err, RegError::Schema { msg, .. } if msg.contains("X_1")),
            "{err}"
        );
    }

    #[test]
    fn test_regwen() {
        let block = compile(json!({
            "name": "b",
            "registers": [
                {"name": "CFG_REGWEN", "swaccess": "rw0c", "resval": 1, "fields": [{"name": "EN", "bits": "0"}]},
                {"name": "LOCK_REGWEN", "fields": [{"name": "EN", "bits": "0"}]},
                {"name": "CFG", "regwen": "CFG_REGWEN", "fields": [{"name": "V", "bits": "7:0"}]},
            ]
        }))
        .unwrap();
        assert_eq!(block.unused_regwens(), ["LOCK_REGWEN"]);

        let err = compile(json!({
            "name": "b",
            "registers": [
                {"name": "CFG", "regwen": "NOPE", "fields": [{"name": "V", "bits": "0"}]},
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
        assert_eq!(err.location().register.as_deref(), Some("CFG"));

        let err = compile(json!({
            "name": "b",
            "registers": [
                {"window": {"name": "W", "items": 1}},
                {"name": "CFG", "regwen": "W", "fields": [{"name": "V", "bits": "0"}]},
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }

    #[test]
    fn test_regwidth() {
        let block = compile(json!({
            "name": "wide",
            "regwidth": 64,
            "registers": [
                {"name": "A", "fields": [{"bits": "63:0"}]},
                {"name": "B", "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap();
        assert_eq!(offsets(&block), [("A", 0), ("B", 8)]);
        assert_eq!(block.size, 16);

        let err = compile(json!({"name": "odd", "regwidth": 12, "registers": []})).unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");

        let err = compile(json!({
            "name": "narrow",
            "regwidth": 8,
            "registers": [{"name": "A", "fields": [{"bits": "8"}]}]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::FieldWidth { .. }), "{err}");
    }

    #[test]
    fn test_metadata_keys_ignored_and_unknown_register_keys_rejected() {
        let block = compile(json!({
            "name": "b",
            "clocking": [{"clock": "clk_i", "reset": "rst_ni"}],
            "bus_interfaces": [{"protocol": "tlul", "direction": "device"}],
            "registers": [{"name": "A", "fields": [{"bits": "0"}]}]
        }))
        .unwrap();
        assert_eq!(block.registers().count(), 1);

        let err = compile(json!({
            "name": "b",
            "registers": [{"name": "A", "colour": "red", "fields": [{"bits": "0"}]}]
        }))
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }

    #[test]
    fn test_empty_block_has_one_word() {
        let block = compile(json!({"name": "empty", "registers": []})).unwrap();
        assert!(block.entities.is_empty());
        assert_eq!(block.size, 4);
    }

    #[test]
    fn test_json_round_trip_validates() {
        let block = compile(json!({
            "name": "gpio",
            "param_list": [{"name": "N", "default": 3, "desc": "pins"}],
            "registers": [
                {"name": "DIR_REGWEN", "fields": [{"name": "EN", "bits": "0", "resval": 1}]},
                {"name": "DIR", "regwen": "DIR_REGWEN", "shadowed": true, "tags": ["excl:CsrAllTests"],
                 "fields": [{"name": "OUT", "bits": "2:0", "enum": [{"value": 0, "name": "in"}, {"value": 7, "name": "out"}]}]},
                {"multireg": {"name": "PIN", "count": "N", "fields": [{"name": "EN", "bits": "3:0", "mubi": true, "resval": false}],
                              "resval_overrides": [{"index": 1, "field": "EN", "resval": true}]}},
                {"window": {"name": "BUF", "items": 8, "validbits": 16}},
            ]
        }))
        .unwrap();
        let text = serde_json::to_string_pretty(&block).unwrap();
        let back: BlockMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back, block);
        back.validate().unwrap();
        let Some(Entity::Register(pin1)) = back.get("PIN_1") else {
            panic!("PIN_1 missing");
        };
        assert_eq!(pin1.resval(), 0x6);
        assert_eq!(back.get("PIN_0").map(|e| e.offset()), Some(8));
    }

    #[test]
    fn test_validate_rejects_tampered_ir() {
        let block = compile(json!({
            "name": "b",
            "registers": [
                {"name": "A", "fields": [{"bits": "0"}]},
                {"name": "B", "fields": [{"bits": "0"}]},
            ]
        }))
        .unwrap();

        let mut bad = block.clone();
        if let Entity::Register(r) = &mut bad.entities[1] {
            r.offset = 2;
        }
        assert!(matches!(bad.validate(), Err(RegError::Alignment { .. })));

        let mut bad = block.clone();
        if let Entity::Register(r) = &mut bad.entities[1] {
            r.offset = 0;
        }
        assert!(matches!(bad.validate(), Err(RegError::AddressOverlap { .. })));

        let mut bad = block;
        if let Entity::Register(r) = &mut bad.entities[0] {
            r.fields[0].resval = 2;
        }
        assert!(matches!(bad.validate(), Err(RegError::FieldRange { .. })));
    }

    #[test]
    fn test_deterministic() {
        let raw = json!({
            "name": "b",
            "registers": [
                {"multireg": {"name": "M", "count": 3, "fields": [{"bits": "0"}]}},
                {"window": {"name": "W", "items": 3}},
            ]
        });
        let first = serde_json::to_string(&compile(raw.clone()).unwrap()).unwrap();
        let second = serde_json::to_string(&compile(raw).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_large_multireg() {
        let count = 20_000u64;
        let block = compile(json!({
            "name": "big",
            "registers": [
                {"name": "BIG_REGWEN", "fields": [{"name": "EN", "bits": "0", "resval": 1}]},
                {"multireg": {
                    "name": "M",
                    "count": count,
                    "regwen": "BIG_REGWEN",
                    "fields": [{"name": "V", "bits": "15:0"}],
                }},
            ]
        }))
        .unwrap();
        assert_eq!(block.entities.len() as u64, count + 1);
        let last = format!("M_{}", count - 1);
        assert_eq!(
            block.entities.last().map(|e| (e.name(), e.offset())),
            Some((last.as_str(), count * 4))
        );
        assert_eq!(block.size, 0x20000);
        assert!(block.unused_regwens().is_empty());
        block.validate().unwrap();
    }
}
