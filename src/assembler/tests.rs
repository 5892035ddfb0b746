use super::{assemble, Assembler, AssemblyResult};
use crate::core::assembler::error::AsmErrorKind;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn ok(source: &str) -> AssemblyResult {
    let result = assemble(source);
    let messages: Vec<String> = result.errors.iter().map(|d| d.format()).collect();
    assert!(result.success(), "unexpected errors: {messages:?}");
    result
}

/// Assemble a single instruction at 0100h and return its bytes.
fn line_bytes(line: &str) -> Vec<u8> {
    let source = format!("        ORG 100h\n        {line}\n");
    ok(&source).bytes
}

fn parse_hex_byte(s: &str) -> u8 {
    u8::from_str_radix(s, 16).unwrap()
}

/// Every decoded byte of a data record, checksum included, sums to 0.
fn verify_record_checksum(line: &str) {
    assert!(line.starts_with(':'), "record must start with ':': {line}");
    let bytes = &line[1..];
    assert_eq!(bytes.len() % 2, 0);
    let mut sum: u8 = 0;
    for idx in (0..bytes.len()).step_by(2) {
        sum = sum.wrapping_add(parse_hex_byte(&bytes[idx..idx + 2]));
    }
    assert_eq!(sum, 0, "record bytes must sum to 0 mod 256: {line}");
}

fn temp_dir(tag: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    dir.push(format!("forge80-asm-{tag}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const HELLO: &str = "        ORG  0100h
BDOS    EQU  0005h
PRINT   EQU  9
START:  LD   C,PRINT
        LD   DE,MSG
        CALL BDOS
        RET
MSG:    DEFM 'Hi'
        DB   0Dh,0Ah,'$'
        END  START
";

#[test]
fn cpm_hello_world() {
    let result = ok(HELLO);
    assert_eq!(result.load_address, 0x0100);
    assert_eq!(
        result.bytes,
        [0x0E, 0x09, 0x11, 0x09, 0x01, 0xCD, 0x05, 0x00, 0xC9, 0x48, 0x69, 0x0D, 0x0A, 0x24]
    );
    assert_eq!(result.bytes.len(), 14);
    assert_eq!(result.symbols.lookup("MSG"), Some(0x0109));
    assert_eq!(result.symbols.lookup("BDOS"), Some(0x0005));
    assert_eq!(result.symbols.lookup("START"), Some(0x0100));
    assert!(result.warnings.is_empty());
}

#[test]
fn forward_reference_resolves() {
    let result = ok("        ORG 0100h
        JP  TARGET
        NOP
TARGET: HALT
");
    assert_eq!(result.bytes, [0xC3, 0x04, 0x01, 0x00, 0x76]);
    assert_eq!(result.symbols.lookup("TARGET"), Some(0x0104));
}

#[test]
fn relative_jump_out_of_range() {
    let result = assemble(
        "        ORG 0100h
        JR  FAR
        DS  200
FAR:    NOP
",
    );
    assert!(!result.success());
    assert!(result.hex.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].format(),
        "Line 2: ERROR: Relative jump to 'FAR' out of range"
    );
}

#[test]
fn djnz_loop() {
    let result = ok("        ORG  0100h
        LD   B,10
LOOP:   DEC  B
        DJNZ LOOP
        RET
");
    assert_eq!(result.bytes, [0x06, 0x0A, 0x05, 0x10, 0xFD, 0xC9]);
}

#[test]
fn intel_and_zilog_sources_assemble_identically() {
    let a = ok("ORG 100h
        LXI H,1234h
        MOV A,M
        RET
");
    let b = ok("ORG 100h
        LD HL,1234h
        LD A,(HL)
        RET
");
    assert_eq!(a.bytes, [0x21, 0x34, 0x12, 0x7E, 0xC9]);
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn indexed_addressing() {
    let result = ok("        ORG 0100h
        LD  A,(IX+5)
        LD  (IY-3),B
        BIT 7,(IX+0)
");
    assert_eq!(
        result.bytes,
        [0xDD, 0x7E, 0x05, 0xFD, 0x70, 0xFD, 0xDD, 0xCB, 0x00, 0x7E]
    );
}

#[test]
fn hex_records_have_valid_checksums() {
    let result = ok(HELLO);
    let hex = result.hex.expect("hex on success");
    for line in hex.lines() {
        verify_record_checksum(line);
    }
    // 14 bytes fit one 16-byte record at the load address.
    assert!(hex.starts_with(":0E010000"));
}

#[test]
fn hex_terminates_with_eof_record() {
    let result = ok(HELLO);
    let hex = result.hex.expect("hex on success");
    assert!(hex.ends_with(":00000001FF\r\n"));
    let last = hex.lines().last().unwrap();
    assert_eq!(last, ":00000001FF");
    for line in hex.lines() {
        assert!(line.starts_with(':'));
    }
}

#[test]
fn hex_uses_crlf_and_sixteen_byte_records() {
    let mut source = String::from("        ORG 0\n");
    for i in 0..20 {
        source.push_str(&format!("        DB {i}\n"));
    }
    let result = ok(&source);
    let hex = result.hex.expect("hex");
    let lines: Vec<&str> = hex.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(":10000000"));
    assert!(lines[1].starts_with(":04001000"));
    assert_eq!(hex.matches("\r\n").count(), 3);
}

#[test]
fn passes_agree_on_sizing() {
    // Every label address must equal the load address plus the byte offset
    // its code actually landed at; forward references must not skew sizing.
    let result = ok("        ORG 0100h
        JP  L1
L1:     LD  HL,L2
        JR  L2
L2:     LD  A,(L3)
        DJNZ L1
L3:     DB  1,2,3
LAST:   NOP
");
    let expected_last = result.load_address + (result.bytes.len() as u16) - 1;
    assert_eq!(result.symbols.lookup("LAST"), Some(expected_last));
    assert_eq!(result.symbols.lookup("L1"), Some(0x0103));
    assert_eq!(result.symbols.lookup("L2"), Some(0x0108));
    assert_eq!(result.symbols.lookup("L3"), Some(0x010D));
}

#[test]
fn referenced_labels_are_all_defined() {
    let result = ok("        ORG 0100h
        CALL SUB
        JP   DONE
SUB:    RET
DONE:   HALT
");
    for name in ["SUB", "DONE"] {
        assert!(result.symbols.contains(name), "{name} missing");
    }
}

#[test]
fn assembly_is_deterministic() {
    let first = ok(HELLO);
    let second = ok(HELLO);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.hex, second.hex);
    assert_eq!(first.listing, second.listing);
}

#[test]
fn engine_resets_between_calls() {
    let mut assembler = Assembler::new();
    let first = assembler.assemble("ORG 100h\nFOO: DB 1\n");
    assert!(first.success());
    let second = assembler.assemble("ORG 200h\nBAR: DB 2\n");
    assert!(second.success());
    assert_eq!(second.load_address, 0x0200);
    assert!(!second.symbols.contains("FOO"));
    assert_eq!(second.bytes, [2]);
}

/// Every supported 8080 mnemonic encodes exactly like its Z80 spelling.
#[test]
fn intel_mnemonics_match_zilog_encodings() {
    let pairs = [
        ("MOV A,B", "LD A,B"),
        ("MOV D,E", "LD D,E"),
        ("MOV M,B", "LD (HL),B"),
        ("MVI C,9", "LD C,9"),
        ("MVI M,0", "LD (HL),0"),
        ("LXI H,1234h", "LD HL,1234h"),
        ("LXI B,8", "LD BC,8"),
        ("LXI SP,0FFFEh", "LD SP,0FFFEh"),
        ("LDA 1234h", "LD A,(1234h)"),
        ("STA 1234h", "LD (1234h),A"),
        ("LHLD 1234h", "LD HL,(1234h)"),
        ("SHLD 1234h", "LD (1234h),HL"),
        ("LDAX B", "LD A,(BC)"),
        ("LDAX D", "LD A,(DE)"),
        ("STAX B", "LD (BC),A"),
        ("STAX D", "LD (DE),A"),
        ("XCHG", "EX DE,HL"),
        ("XTHL", "EX (SP),HL"),
        ("SPHL", "LD SP,HL"),
        ("PCHL", "JP (HL)"),
        ("ADD B", "ADD A,B"),
        ("ADC C", "ADC A,C"),
        ("SBB H", "SBC A,H"),
        ("ANA B", "AND B"),
        ("XRA C", "XOR C"),
        ("ORA D", "OR D"),
        ("CMP E", "CP E"),
        ("ADI 5", "ADD A,5"),
        ("ACI 5", "ADC A,5"),
        ("SUI 5", "SUB 5"),
        ("SBI 5", "SBC A,5"),
        ("ANI 5", "AND 5"),
        ("XRI 5", "XOR 5"),
        ("ORI 5", "OR 5"),
        ("CPI 5", "CP 5"),
        ("INR A", "INC A"),
        ("DCR B", "DEC B"),
        ("INR M", "INC (HL)"),
        ("INX B", "INC BC"),
        ("INX D", "INC DE"),
        ("DCX H", "DEC HL"),
        ("DCX SP", "DEC SP"),
        ("DAD B", "ADD HL,BC"),
        ("DAD SP", "ADD HL,SP"),
        ("JMP 1234h", "JP 1234h"),
        ("JNZ 1234h", "JP NZ,1234h"),
        ("JZ 1234h", "JP Z,1234h"),
        ("JNC 1234h", "JP NC,1234h"),
        ("JC 1234h", "JP C,1234h"),
        ("JPO 1234h", "JP PO,1234h"),
        ("JPE 1234h", "JP PE,1234h"),
        ("JM 1234h", "JP M,1234h"),
        ("CNZ 1234h", "CALL NZ,1234h"),
        ("CZ 1234h", "CALL Z,1234h"),
        ("CNC 1234h", "CALL NC,1234h"),
        ("CC 1234h", "CALL C,1234h"),
        ("CPO 1234h", "CALL PO,1234h"),
        ("CPE 1234h", "CALL PE,1234h"),
        ("CM 1234h", "CALL M,1234h"),
        ("RNZ", "RET NZ"),
        ("RZ", "RET Z"),
        ("RNC", "RET NC"),
        ("RC", "RET C"),
        ("RPO", "RET PO"),
        ("RPE", "RET PE"),
        ("RP", "RET P"),
        ("RM", "RET M"),
        ("RLC", "RLCA"),
        ("RRC", "RRCA"),
        ("RAL", "RLA"),
        ("RAR", "RRA"),
        ("CMA", "CPL"),
        ("STC", "SCF"),
        ("CMC", "CCF"),
        ("HLT", "HALT"),
        ("IN 5", "IN A,(5)"),
        ("OUT 5", "OUT (5),A"),
        ("PUSH B", "PUSH BC"),
        ("PUSH D", "PUSH DE"),
        ("PUSH H", "PUSH HL"),
        ("PUSH PSW", "PUSH AF"),
        ("POP B", "POP BC"),
        ("POP PSW", "POP AF"),
    ];
    for (intel, zilog) in pairs {
        let a = line_bytes(intel);
        let b = line_bytes(zilog);
        assert_eq!(a, b, "{intel} vs {zilog}");
        assert!(!a.is_empty(), "{intel} emitted nothing");
    }
}

#[test]
fn first_org_sets_load_address_later_orgs_move_pc() {
    let result = ok("        ORG 100h
        DB  1
        ORG 200h
LAB:    DB  2
");
    assert_eq!(result.load_address, 0x0100);
    assert_eq!(result.bytes, [1, 2]);
    assert_eq!(result.symbols.lookup("LAB"), Some(0x0200));
}

#[test]
fn source_without_org_loads_at_zero() {
    let result = ok("START: NOP\n");
    assert_eq!(result.load_address, 0);
    assert_eq!(result.symbols.lookup("START"), Some(0));
}

#[test]
fn duplicate_label_is_reported_once() {
    let result = assemble("FOO:  NOP\nFOO:  NOP\n");
    assert!(!result.success());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].format(), "Line 2: ERROR: Duplicate label 'FOO'");
    assert_eq!(result.errors[0].kind(), AsmErrorKind::Symbol);
}

#[test]
fn unknown_mnemonic_is_reported_once() {
    let result = assemble("        FROB A\n");
    assert!(!result.success());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].format(), "Line 1: ERROR: Unknown mnemonic 'FROB'");
}

#[test]
fn undefined_label_is_reported_by_patcher() {
    let result = assemble("        ORG 100h\n        JP NOWHERE\n");
    assert!(!result.success());
    assert!(result.hex.is_none());
    assert_eq!(result.errors[0].format(), "Line 2: ERROR: Undefined label 'NOWHERE'");
}

#[test]
fn equ_referencing_later_label_heals_through_patch_table() {
    let result = ok("        ORG 100h
        LD  HL,VAL
DONE:   HALT
VAL     EQU AFTER
AFTER:  NOP
");
    assert_eq!(result.symbols.lookup("AFTER"), Some(0x0104));
    assert_eq!(result.symbols.lookup("VAL"), Some(0x0104));
    assert_eq!(result.bytes, [0x21, 0x04, 0x01, 0x76, 0x00]);
}

#[test]
fn set_symbols_may_rebind() {
    let result = ok("COUNT   SET 1
        DB  COUNT
COUNT   SET 2
        DB  COUNT
");
    assert_eq!(result.bytes, [1, 2]);
}

#[test]
fn defc_binds_a_constant() {
    let result = ok("        DEFC TPA = 0100h
        ORG  TPA
        JP   TPA
");
    assert_eq!(result.load_address, 0x0100);
    assert_eq!(result.bytes, [0xC3, 0x00, 0x01]);
}

#[test]
fn dollar_is_the_current_pc() {
    let result = ok("        ORG 100h
HERE:   JP  $
        DW  $
");
    assert_eq!(result.bytes, [0xC3, 0x00, 0x01, 0x03, 0x01]);
}

#[test]
fn data_directives() {
    let result = ok("        ORG 0
        DB  'AB',3
        DW  1234h,5
        DS  3,0FFh
        DS  2
");
    assert_eq!(
        result.bytes,
        [0x41, 0x42, 0x03, 0x34, 0x12, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0x00]
    );
}

#[test]
fn dw_forward_reference_is_patched() {
    let result = ok("        ORG 100h
        DW  TABLE
TABLE:  NOP
");
    assert_eq!(result.bytes, [0x02, 0x01, 0x00]);
}

#[test]
fn ds_with_forward_count_is_an_error() {
    let result = assemble("        DS N\nN EQU 4\n");
    assert!(!result.success());
    assert!(result.errors[0].message().contains("Forward reference in DS"));
}

#[test]
fn dotted_and_linkage_directives_are_skipped() {
    let result = ok("        .Z80
        PUBLIC FOO
        EXTERN BAR
        SECTION code
        TITLE demo program
        IF 0
        NOP
        ENDIF
        .8080
FOO:    NOP
");
    // IF/ELSE/ENDIF are tokenized but not interpreted; the body assembles.
    assert_eq!(result.bytes, [0x00, 0x00]);
    assert!(result.symbols.contains("FOO"));
}

#[test]
fn end_stops_assembly() {
    let result = ok("        DB 1\n        END\n        DB 2\n");
    assert_eq!(result.bytes, [1]);
}

#[test]
fn dollar_separated_names_fold_to_one_symbol() {
    let result = ok("set$alloc$bit EQU 5
        LD A,setallocbit
");
    assert_eq!(result.bytes, [0x3E, 0x05]);
    assert!(result.symbols.contains("setallocbit"));
}

#[test]
fn listing_uses_address_and_byte_columns() {
    let result = ok(HELLO);
    assert_eq!(result.listing.len(), 10);
    assert_eq!(
        result.listing[3],
        "0100  0E 09         START:  LD   C,PRINT"
    );
    assert_eq!(
        result.listing[5],
        "0105  CD 05 00      CALL BDOS"
    );
}

#[test]
fn encode_failure_keeps_passes_in_lockstep() {
    // The bad line pads with its pass-1 size, so LAST still lands where
    // Pass 1 put it.
    let result = assemble("        ORG 100h
        LD  A,(BC)
        LD  (HL),(HL)
LAST:   NOP
");
    assert!(!result.success());
    assert_eq!(result.symbols.lookup("LAST"), Some(0x0101));
}

#[test]
fn include_files_are_inlined() {
    let dir = temp_dir("include");
    fs::write(dir.join("lib.asm"), "LIBFN:  RET\n").unwrap();
    let main_path = dir.join("main.asm");
    let source = "        ORG 100h
        CALL LIBFN
        INCLUDE \"lib.asm\"
";
    fs::write(&main_path, source).unwrap();

    let mut assembler = Assembler::new();
    assembler.set_origin(main_path);
    let result = assembler.assemble(source);
    let messages: Vec<String> = result.errors.iter().map(|d| d.format()).collect();
    assert!(result.success(), "unexpected errors: {messages:?}");
    assert_eq!(result.bytes, [0xCD, 0x03, 0x01, 0xC9]);
    assert_eq!(result.symbols.lookup("LIBFN"), Some(0x0103));
}

#[test]
fn missing_include_is_a_diagnostic() {
    let result = assemble("        INCLUDE \"gone.asm\"\n        NOP\n");
    assert!(!result.success());
    assert!(result.errors[0].message().contains("Include file not found"));
    // The marker line keeps later line numbers stable.
    assert_eq!(result.bytes, [0x00]);
}

#[test]
fn pc_wraps_at_64k() {
    let result = ok("        ORG 0FFFFh
WRAP:   DB 1,2
AFTER:  NOP
");
    assert_eq!(result.symbols.lookup("WRAP"), Some(0xFFFF));
    assert_eq!(result.symbols.lookup("AFTER"), Some(0x0001));
}
