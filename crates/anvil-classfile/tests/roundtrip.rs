use anvil_classfile::{
    AttributeInfo, ClassFile, ClassHeader, CodeAttribute, ConstantPool, CpInfo, Error, MemberInfo,
};
use pretty_assertions::assert_eq;

fn sample_class() -> ClassFile {
    let mut cp = ConstantPool::new();
    let this_class = cp.intern_class("a").unwrap();
    let super_class = cp.intern_class("java/lang/Object").unwrap();
    let runnable = cp.intern_class("java/lang/Runnable").unwrap();
    let field_ref = cp.intern_field_ref("a", "b", "I").unwrap();
    cp.intern(CpInfo::Double(1.5f64.to_bits())).unwrap();
    cp.intern_string("hello").unwrap();

    let field = MemberInfo {
        access_flags: 0x0002,
        name_index: cp.intern_utf8("b").unwrap(),
        descriptor_index: cp.intern_utf8("I").unwrap(),
        attributes: Vec::new(),
    };
    let code = CodeAttribute {
        max_stack: 1,
        max_locals: 1,
        code: vec![0x2a, 0xb4, (field_ref >> 8) as u8, field_ref as u8, 0x57, 0xb1],
        exception_table: Vec::new(),
        attributes: Vec::new(),
    };
    let method = MemberInfo {
        access_flags: 0x0001,
        name_index: cp.intern_utf8("run").unwrap(),
        descriptor_index: cp.intern_utf8("()V").unwrap(),
        attributes: vec![AttributeInfo {
            name_index: cp.intern_utf8("Code").unwrap(),
            info: code.to_bytes(),
        }],
    };

    ClassFile {
        minor_version: 0,
        major_version: 52,
        constant_pool: cp,
        access_flags: 0x0021,
        this_class,
        super_class,
        interfaces: vec![runnable],
        fields: vec![field],
        methods: vec![method],
        attributes: Vec::new(),
    }
}

#[test]
fn written_class_parses_back_identically() {
    let class = sample_class();
    let bytes = class.to_bytes();
    let parsed = ClassFile::parse(&bytes).unwrap();

    assert_eq!(parsed.name().unwrap(), "a");
    assert_eq!(parsed.super_name().unwrap().as_deref(), Some("java/lang/Object"));
    assert_eq!(parsed.interface_names().unwrap(), vec!["java/lang/Runnable"]);
    assert_eq!(parsed.fields, class.fields);
    assert_eq!(parsed.methods, class.methods);
    assert_eq!(parsed.to_bytes(), bytes);
}

#[test]
fn header_parse_reads_hierarchy_only() {
    let bytes = sample_class().to_bytes();
    let header = ClassHeader::parse(&bytes).unwrap();
    assert_eq!(
        header,
        ClassHeader {
            access_flags: 0x0021,
            name: "a".to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: vec!["java/lang/Runnable".to_string()],
        }
    );
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = sample_class().to_bytes();
    bytes[0] = 0;
    assert!(matches!(ClassFile::parse(&bytes), Err(Error::BadMagic(_))));
}

#[test]
fn truncated_class_is_rejected() {
    let bytes = sample_class().to_bytes();
    assert!(matches!(
        ClassFile::parse(&bytes[..bytes.len() - 3]),
        Err(Error::Truncated)
    ));
}
