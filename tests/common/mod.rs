// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! `FakeJdk` stands in for the analyzer and compiler so the whole injection
//! workflow runs without a JDK installed.

#![allow(dead_code)]

use modinject::{
    ExistingDescriptor, InjectConfig, InjectOutcome, InjectionHost, ToolCommand,
    ToolInvocationResult, ToolRunner,
};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::write::{FileOptions, ZipWriter};

pub const FAKE_ANALYZER: &str = "fake-jdeps";
pub const FAKE_COMPILER: &str = "fake-javac";

/// Configuration pointing at the fake tools
pub fn fake_config() -> InjectConfig {
    InjectConfig::default()
        .with_analyzer(FAKE_ANALYZER)
        .with_compiler(FAKE_COMPILER)
}

/// What the fake analyzer does when run
#[derive(Debug, Clone)]
pub enum AnalyzerScript {
    /// Write this descriptor source and report its path
    Generate(String),
    /// Report these names as unresolved
    Missing(Vec<String>),
    /// Print this text and write nothing
    Fail(String),
}

/// Scripted analyzer and compiler
///
/// Like javac compiling a lone descriptor, the compiler rejects any exported
/// package with no class file under its `-d` directory.
pub struct FakeJdk {
    pub analyzer: AnalyzerScript,
    /// If set, every compile fails with this text
    pub compile_failure: Option<String>,
    pub commands: RefCell<Vec<ToolCommand>>,
}

impl FakeJdk {
    pub fn generating(source: &str) -> Self {
        Self {
            analyzer: AnalyzerScript::Generate(source.to_string()),
            compile_failure: None,
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn missing(names: &[&str]) -> Self {
        Self {
            analyzer: AnalyzerScript::Missing(names.iter().map(|n| n.to_string()).collect()),
            ..Self::generating("")
        }
    }

    pub fn with_compile_failure(mut self, output: &str) -> Self {
        self.compile_failure = Some(output.to_string());
        self
    }

    pub fn runs_of(&self, program: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.program.ends_with(program))
            .count()
    }

    fn analyze(&self, command: &ToolCommand) -> ToolInvocationResult {
        match &self.analyzer {
            AnalyzerScript::Generate(source) => {
                let out_dir = PathBuf::from(command.flag_value("--generate-module-info").unwrap());
                let module_dir = out_dir.join("lib");
                fs::create_dir_all(&module_dir).unwrap();
                let path = module_dir.join("module-info.java");
                fs::write(&path, source).unwrap();
                ToolInvocationResult::new(Some(0), format!("writing to {}\n", path.display()))
            }
            AnalyzerScript::Missing(names) => {
                let mut output = String::from(
                    "Missing dependence: lib/module-info.java not generated\nError: missing dependencies\n",
                );
                for name in names {
                    output.push_str(&format!(
                        "   com.example.Client -> {}    not found\n",
                        name
                    ));
                }
                ToolInvocationResult::new(Some(1), output)
            }
            AnalyzerScript::Fail(text) => ToolInvocationResult::new(Some(1), text.clone()),
        }
    }

    fn compile(&self, command: &ToolCommand) -> ToolInvocationResult {
        if let Some(failure) = &self.compile_failure {
            return ToolInvocationResult::new(Some(1), failure.clone());
        }

        let source_path = PathBuf::from(command.args.last().unwrap());
        let source = fs::read_to_string(&source_path).unwrap();
        let out_dir = PathBuf::from(command.flag_value("-d").unwrap());

        for package in exported_packages(&source) {
            if !has_classes(&out_dir, &package) {
                return ToolInvocationResult::new(
                    Some(1),
                    format!(
                        "{}:3: error: package is empty or does not exist: {}\n    exports {};\n            ^\n1 error\n",
                        source_path.display(),
                        package,
                        package
                    ),
                );
            }
        }

        fs::write(out_dir.join("module-info.class"), compiled_bytes(&source)).unwrap();
        ToolInvocationResult::new(Some(0), "")
    }
}

/// Packages named by unqualified `exports <pkg>;` lines
fn exported_packages(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("exports ")?;
            let package = rest.strip_suffix(';')?.trim();
            Some(package.to_string())
        })
        .collect()
}

/// Whether `<out_dir>/<package path>/` holds at least one class file
fn has_classes(out_dir: &Path, package: &str) -> bool {
    let dir = out_dir.join(package.replace('.', "/"));
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().is_some_and(|ext| ext == "class"))
        })
        .unwrap_or(false)
}

impl ToolRunner for FakeJdk {
    fn run(&self, command: &ToolCommand) -> modinject::Result<ToolInvocationResult> {
        self.commands.borrow_mut().push(command.clone());
        if command.program.ends_with(FAKE_ANALYZER) {
            Ok(self.analyze(command))
        } else if command.program.ends_with(FAKE_COMPILER) {
            Ok(self.compile(command))
        } else {
            panic!("unexpected program {}", command.program)
        }
    }
}

/// Bytes the fake compiler writes for a given source
pub fn compiled_bytes(source: &str) -> Vec<u8> {
    let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE];
    bytes.extend_from_slice(source.as_bytes());
    bytes
}

/// Host that answers the overwrite prompt with a fixed value and records calls
pub struct ScriptedHost {
    pub answer: bool,
    pub prompts: Vec<ExistingDescriptor>,
    pub reported: Vec<bool>,
}

impl ScriptedHost {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
            reported: Vec::new(),
        }
    }
}

impl InjectionHost for ScriptedHost {
    fn confirm_overwrite(&mut self, _archive: &Path, existing: &ExistingDescriptor) -> bool {
        self.prompts.push(existing.clone());
        self.answer
    }

    fn report(&mut self, result: &modinject::Result<InjectOutcome>) {
        self.reported.push(result.is_ok());
    }
}

/// Write a jar with the given entries; names ending in `/` become directories
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, bytes) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// A small library jar: manifest, one class, one resource
pub fn sample_jar(dir: &Path) -> PathBuf {
    let jar = dir.join("lib.jar");
    write_jar(
        &jar,
        &[
            ("META-INF/", b""),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n"),
            ("com/", b""),
            ("com/example/", b""),
            ("com/example/api/", b""),
            ("com/example/api/Client.class", b"\xCA\xFE\xBA\xBEclient"),
            ("com/example/api/messages.properties", b"greeting=hello\n"),
        ],
    );
    jar
}

/// Contents of every file entry, by name
pub fn read_files(jar: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(File::open(jar).unwrap()).unwrap();
    let mut files = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        files.push((entry.name().to_string(), bytes));
    }
    files
}

/// Bytes of one entry, if present
pub fn read_file(jar: &Path, name: &str) -> Option<Vec<u8>> {
    read_files(jar)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, bytes)| bytes)
}

/// Names in the archive directory besides the archive itself
pub fn siblings(dir: &Path, archive: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p != archive)
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
