#![allow(dead_code)]

use std::cell::Cell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anvil_classfile::{AttributeInfo, ClassFile, CodeAttribute, ConstantPool, MemberInfo};
use anvil_config::PipelineConfig;
use anvil_pipeline::{Decompiler, PipelineError, Result};
use zip::write::FileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};

pub const GAME_VERSION: &str = "1.12.2";

pub const COMPACT: &str = "\
a net/minecraft/server/Alpha
a f field_1_f
a foo (I)V func_2_foo
";
pub const FIELDS_CSV: &str = "searge,name,side,desc\nfield_1_f,health,2,\n";
pub const METHODS_CSV: &str = "searge,name,side,desc\nfunc_2_foo,tick,1,\n";

/// `class a { int f; void foo(int) {} }`
pub fn class_a() -> Vec<u8> {
    let mut cp = ConstantPool::new();
    let this_class = cp.intern_class("a").unwrap();
    let super_class = cp.intern_class("java/lang/Object").unwrap();
    let field = MemberInfo {
        access_flags: 0x0000,
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
    let code_name = cp.intern_utf8("Code").unwrap();
    let method = MemberInfo {
        access_flags: 0x0000,
        name_index: cp.intern_utf8("foo").unwrap(),
        descriptor_index: cp.intern_utf8("(I)V").unwrap(),
        attributes: vec![AttributeInfo {
            name_index: code_name,
            info: code.to_bytes(),
        }],
    };

    ClassFile {
        minor_version: 0,
        major_version: 52,
        constant_pool: cp,
        access_flags: 0x0020,
        this_class,
        super_class,
        interfaces: Vec::new(),
        fields: vec![field],
        methods: vec![method],
        attributes: Vec::new(),
    }
    .to_bytes()
}

/// Entries are stamped 2000-01-01 so mtime comparisons are predictable.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::<()>::default()
        .last_modified_time(DateTime::from_date_and_time(2000, 1, 1, 0, 0, 0).unwrap());
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

pub fn jar_bytes(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let path = dir.join(name);
    write_jar(&path, entries);
    std::fs::read(path).unwrap()
}

pub fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries
}

pub fn read_entry(path: &Path, name: &str) -> Option<Vec<u8>> {
    read_entries(path)
        .into_iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, content)| content)
}

/// Stand-in for the JVM decompiler: every class becomes a fixed Java source
/// named after it, other entries are copied.
#[derive(Clone, Default)]
pub struct FakeDecompiler {
    pub calls: Rc<Cell<usize>>,
}

pub fn fake_source(class_name: &str) -> String {
    let (package, simple) = class_name.rsplit_once('/').unwrap_or(("", class_name));
    format!(
        "package {};\r\n\r\nclass {simple} {{   \r\n    int health;\r\n    void tick(int x) {{}}\r\n}}\r\n\r\n",
        package.replace('/', ".")
    )
}

impl Decompiler for FakeDecompiler {
    fn decompile(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        let output = output_dir.join(input.file_name().unwrap());
        let mut zip = ZipWriter::new(File::create(&output).map_err(|source| PipelineError::Io {
            path: output.clone(),
            source,
        })?);
        let options = FileOptions::<()>::default();
        for (name, content) in read_entries(input) {
            if let Some(class) = name.strip_suffix(".class") {
                zip.start_file(format!("{class}.java"), options).unwrap();
                zip.write_all(fake_source(class).as_bytes()).unwrap();
            } else {
                zip.start_file(name, options).unwrap();
                zip.write_all(&content).unwrap();
            }
        }
        zip.finish().unwrap();
        Ok(output)
    }
}

/// A configuration with every directory below `root`.
pub fn config(root: &Path, server_url: impl Fn(&str) -> String) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.module = "server".into();
    config.game_version = GAME_VERSION.into();
    config.mapping_version = "stable-39".into();
    config.repository = Some(root.join("repository"));
    config.source_directory = Some(root.join("src"));
    config.patch_directory = Some(root.join("patches"));
    config.resource_directory = Some(root.join("resources"));
    config.urls.version_manifest = server_url("/version_manifest.json");
    config.urls.srg = server_url("/srg/{game}/mcp-{game}-csrg.zip");
    config.urls.mcp = server_url("/mcp_{channel}/{version}-{game}/mcp.zip");
    config.urls.mcp_live = server_url("/live/{name}.csv");
    config.git.timeout_ms = Some(60_000);
    config
}
