#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use anvil_classfile::{AttributeInfo, ClassFile, CodeAttribute, ConstantPool, MemberInfo};
use anvil_mappings::{CompactMapping, CsvMapping, Side};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const COMPACT: &str = "\
# obfuscated names
a net/minecraft/server/Alpha
b net/minecraft/server/Beta
a f field_1_f
a foo (I)V func_2_foo
";

pub fn compact() -> CompactMapping {
    CompactMapping::parse(COMPACT)
}

pub fn fields() -> CsvMapping {
    CsvMapping::parse("searge,name,side,desc\nfield_1_f,health,2,\n", Side::Server).unwrap()
}

pub fn methods() -> CsvMapping {
    CsvMapping::parse("searge,name,side,desc\nfunc_2_foo,tick,1,\n", Side::Server).unwrap()
}

fn attribute(cp: &mut ConstantPool, name: &str, info: Vec<u8>) -> AttributeInfo {
    AttributeInfo {
        name_index: cp.intern_utf8(name).unwrap(),
        info,
    }
}

/// `class a { int f; void foo(int) {} }`
pub fn class_a() -> Vec<u8> {
    let mut cp = ConstantPool::new();
    let this_class = cp.intern_class("a").unwrap();
    let super_class = cp.intern_class("java/lang/Object").unwrap();

    let field = MemberInfo {
        access_flags: 0x0001,
        name_index: cp.intern_utf8("f").unwrap(),
        descriptor_index: cp.intern_utf8("I").unwrap(),
        attributes: Vec::new(),
    };
    let code = CodeAttribute {
        max_stack: 0,
        max_locals: 2,
        code: vec![0xb1],
        exception_table: Vec::new(),
        attributes: Vec::new(),
    };
    let method = MemberInfo {
        access_flags: 0x0001,
        name_index: cp.intern_utf8("foo").unwrap(),
        descriptor_index: cp.intern_utf8("(I)V").unwrap(),
        attributes: vec![attribute(&mut cp, "Code", code.to_bytes())],
    };
    let source_file = cp.intern_utf8("SourceFile").unwrap();
    let source_name = cp.intern_utf8("a.java").unwrap();

    ClassFile {
        minor_version: 0,
        major_version: 52,
        constant_pool: cp,
        access_flags: 0x0021,
        this_class,
        super_class,
        interfaces: Vec::new(),
        fields: vec![field],
        methods: vec![method],
        attributes: vec![AttributeInfo {
            name_index: source_file,
            info: source_name.to_be_bytes().to_vec(),
        }],
    }
    .to_bytes()
}

/// ```java
/// class b extends a {
///     List<a> items;
///     void run() { this.f; this.foo(1); "f"; }
/// }
/// ```
///
/// The member references go through `b`, so the renames declared on `a` only
/// apply when the hierarchy is consulted.
pub fn class_b() -> Vec<u8> {
    let mut cp = ConstantPool::new();
    let this_class = cp.intern_class("b").unwrap();
    let super_class = cp.intern_class("a").unwrap();
    let field_ref = cp.intern_field_ref("b", "f", "I").unwrap();
    let method_ref = cp.intern_method_ref("b", "foo", "(I)V", false).unwrap();
    let literal = cp.intern_string("f").unwrap();

    let signature = cp.intern_utf8("Ljava/util/List<La;>;").unwrap();
    let items = MemberInfo {
        access_flags: 0x0000,
        name_index: cp.intern_utf8("items").unwrap(),
        descriptor_index: cp.intern_utf8("Ljava/util/List;").unwrap(),
        attributes: vec![attribute(&mut cp, "Signature", signature.to_be_bytes().to_vec())],
    };

    let this_name = cp.intern_utf8("this").unwrap();
    let this_desc = cp.intern_utf8("Lb;").unwrap();
    let mut lvt = vec![0, 1, 0, 0, 0, 14];
    lvt.extend_from_slice(&this_name.to_be_bytes());
    lvt.extend_from_slice(&this_desc.to_be_bytes());
    lvt.extend_from_slice(&[0, 0]);

    let [fh, fl] = field_ref.to_be_bytes();
    let [mh, ml] = method_ref.to_be_bytes();
    let [sh, sl] = literal.to_be_bytes();
    let code = CodeAttribute {
        max_stack: 2,
        max_locals: 1,
        code: vec![
            0x2a, 0xb4, fh, fl, 0x57, // aload_0; getfield b.f; pop
            0x2a, 0x04, 0xb6, mh, ml, // aload_0; iconst_1; invokevirtual b.foo
            0x13, sh, sl, 0x57, // ldc_w "f"; pop
            0xb1,
        ],
        exception_table: Vec::new(),
        attributes: vec![
            attribute(&mut cp, "LineNumberTable", vec![0, 1, 0, 0, 0, 3]),
            attribute(&mut cp, "LocalVariableTable", lvt),
        ],
    };
    let run = MemberInfo {
        access_flags: 0x0001,
        name_index: cp.intern_utf8("run").unwrap(),
        descriptor_index: cp.intern_utf8("()V").unwrap(),
        attributes: vec![attribute(&mut cp, "Code", code.to_bytes())],
    };

    ClassFile {
        minor_version: 0,
        major_version: 52,
        constant_pool: cp,
        access_flags: 0x0021,
        this_class,
        super_class,
        interfaces: Vec::new(),
        fields: vec![items],
        methods: vec![run],
        attributes: Vec::new(),
    }
    .to_bytes()
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = FileOptions::<()>::default();
    for (name, bytes) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
}
