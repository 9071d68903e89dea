// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: debug logging
fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .global(true)
        .action(ArgAction::SetTrue)
        .help("Enable debug logging (RUST_LOG overrides)")
}

fn archive_arg(help: &'static str) -> Arg {
    Arg::new("archive").required(true).help(help)
}

fn build_cli() -> Command {
    Command::new("modinject")
        .version(env!("CARGO_PKG_VERSION"))
        .author("modinject contributors")
        .about("Retrofit legacy jar archives with a compiled module descriptor")
        .subcommand_required(true)
        .arg(verbose_arg())
        .subcommand(
            Command::new("inject")
                .about("Inject a module descriptor into an archive")
                .arg(archive_arg("Archive to retrofit"))
                .arg(
                    Arg::new("dep")
                        .long("dep")
                        .value_name("JAR")
                        .action(ArgAction::Append)
                        .help("Dependency archive placed on the module path (repeatable)"),
                )
                .arg(
                    Arg::new("module")
                        .long("module")
                        .requires("exports")
                        .help("Module name for a synthesized descriptor"),
                )
                .arg(
                    Arg::new("exports")
                        .long("exports")
                        .requires("module")
                        .help("Comma-separated packages to export from a synthesized descriptor"),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Overwrite an existing descriptor without asking"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_name("FILE")
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("java_home")
                        .long("java-home")
                        .value_name("DIR")
                        .help("JDK root used to find jdeps and javac"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("SECS")
                        .help("Seconds before a hung analyzer or compiler is killed"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show whether an archive carries a module descriptor")
                .arg(archive_arg("Archive to inspect"))
                .arg(
                    Arg::new("entries")
                        .long("entries")
                        .action(ArgAction::SetTrue)
                        .help("Also list every entry"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("modinject.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
