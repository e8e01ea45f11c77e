//! Build automation tasks for the usermgr workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! ## Available Commands
//!
//! - `ci`: Run all CI checks (format, lint, test, deny)
//! - `fmt`: Check/apply code formatting
//! - `clippy`: Run clippy lints
//! - `test`: Run all tests
//! - `deny`: Run cargo-deny checks
//! - `doc`: Generate documentation
//! - `bench`: Run benchmarks
//! - `clean`: Clean build artifacts
//! - `fuzz`: Run fuzz tests (requires cargo-fuzz + nightly)
//! - `fuzz-init`: Scaffold the fuzz crate if it's missing
//! - `dist`: Build release artifacts for distribution
//! - `coverage`: Run code coverage
//! - `semver`: Check for semver violations (requires cargo-semver-checks)

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for usermgr")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all checks (format, lint, test, deny)
    Ci,
    /// Run cargo fmt (--check by default, --fix to apply)
    Fmt {
        /// Apply formatting fixes
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy with all features
    Clippy {
        /// Apply clippy suggestions
        #[arg(long)]
        fix: bool,
    },
    /// Run all tests
    Test {
        /// Test a specific package
        #[arg(short, long)]
        package: Option<String>,
        /// Run integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Run cargo-deny checks
    Deny,
    /// Generate documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Run benchmarks
    Bench {
        /// Benchmark filter pattern
        filter: Option<String>,
    },
    /// Clean build artifacts
    Clean,
    /// Run fuzz tests (requires cargo-fuzz + nightly)
    Fuzz {
        /// Fuzz target to run
        #[arg(default_value = "ldap_filter")]
        target: String,
        /// Maximum runtime in seconds
        #[arg(long, default_value = "60")]
        max_time: u64,
        /// List available fuzz targets
        #[arg(long)]
        list: bool,
    },
    /// Build release artifacts for distribution
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
        /// Skip running tests before building
        #[arg(long)]
        no_test: bool,
    },
    /// Initialize fuzz testing infrastructure
    FuzzInit,
    /// Run code coverage
    Coverage {
        /// Output format (html, lcov, json)
        #[arg(long, default_value = "html")]
        format: String,
    },
    /// Check for semver violations (requires cargo-semver-checks)
    Semver,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // Change to workspace root
    let workspace_root = workspace_root()?;
    sh.change_dir(&workspace_root);

    match cli.command {
        Command::Ci => {
            println!("Running CI checks...");
            fmt(&sh, false)?;
            clippy(&sh, false)?;
            test(&sh, None, false)?;
            deny(&sh)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy { fix } => clippy(&sh, fix)?,
        Command::Test {
            package,
            integration,
        } => test(&sh, package.as_deref(), integration)?,
        Command::Deny => deny(&sh)?,
        Command::Doc { open } => doc(&sh, open)?,
        Command::Bench { filter } => bench(&sh, filter.as_deref())?,
        Command::Clean => clean(&sh)?,
        Command::Fuzz {
            target,
            max_time,
            list,
        } => fuzz(&sh, &target, max_time, list)?,
        Command::Dist { target, no_test } => dist(&sh, target.as_deref(), no_test)?,
        Command::FuzzInit => fuzz_init(&sh)?,
        Command::Coverage { format } => coverage(&sh, &format)?,
        Command::Semver => semver(&sh)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)
        .context("invalid UTF-8 in cargo output")?
        .trim()
        .to_string();

    Ok(PathBuf::from(path)
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying formatting...");
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Formatting applied.");
    } else {
        println!("Checking formatting...");
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Formatting check passed.");
    }
    Ok(())
}

fn clippy(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying clippy suggestions...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets --fix --allow-dirty"
        )
        .run()?;
        println!("✅ Clippy suggestions applied.");
    } else {
        println!("Running clippy...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets -- -D warnings"
        )
        .run()?;
        println!("✅ Clippy check passed.");
    }
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>, integration: bool) -> Result<()> {
    println!("Running tests...");

    let mut args = vec!["test"];

    if let Some(pkg) = package {
        args.push("-p");
        args.push(pkg);
    }

    args.push("--all-features");

    if integration {
        args.push("--features");
        args.push("integration-tests");
    }

    let args_str = args.join(" ");
    cmd!(sh, "cargo {args_str}").run()?;
    println!("✅ All tests passed.");
    Ok(())
}

fn deny(sh: &Shell) -> Result<()> {
    println!("Running cargo-deny...");
    cmd!(sh, "cargo deny check").run()?;
    println!("✅ Cargo-deny check passed.");
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    println!("Generating documentation...");
    if open {
        cmd!(sh, "cargo doc --all-features --no-deps --open").run()?;
    } else {
        cmd!(sh, "cargo doc --all-features --no-deps").run()?;
    }
    println!("✅ Documentation generated.");
    Ok(())
}

fn bench(sh: &Shell, filter: Option<&str>) -> Result<()> {
    println!("Running benchmarks...");
    if let Some(f) = filter {
        cmd!(sh, "cargo bench -- {f}").run()?;
    } else {
        cmd!(sh, "cargo bench").run()?;
    }
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("Cleaning build artifacts...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ Clean complete.");
    Ok(())
}

fn fuzz(sh: &Shell, target: &str, max_time: u64, list: bool) -> Result<()> {
    let fuzz_dir = sh.current_dir().join("fuzz");

    if list {
        println!("Available fuzz targets:");
        let targets_dir = fuzz_dir.join("fuzz_targets");
        if targets_dir.exists() {
            for entry in fs::read_dir(&targets_dir)? {
                let entry = entry?;
                if let Some(name) = entry.path().file_stem() {
                    println!("  - {}", name.to_string_lossy());
                }
            }
        } else {
            println!("  No fuzz targets found. Run `cargo xtask fuzz-init` to set up fuzzing.");
        }
        return Ok(());
    }

    if !fuzz_dir.exists() {
        bail!(
            "Fuzz directory not found. Run `cargo xtask fuzz-init` to set up fuzzing infrastructure."
        );
    }

    println!("Running fuzz target: {target}");
    println!("Max time: {max_time} seconds");

    // cargo-fuzz requires nightly
    let max_time_str = max_time.to_string();
    cmd!(
        sh,
        "cargo +nightly fuzz run {target} -- -max_total_time={max_time_str}"
    )
    .run()?;

    Ok(())
}

fn fuzz_init(sh: &Shell) -> Result<()> {
    let fuzz_dir = sh.current_dir().join("fuzz");

    if fuzz_dir.exists() {
        println!("Fuzz directory already exists.");
        return Ok(());
    }

    println!("Initializing fuzz testing infrastructure...");

    // Create fuzz directory structure
    fs::create_dir_all(fuzz_dir.join("fuzz_targets"))?;

    // Create fuzz Cargo.toml
    let cargo_toml = r#"[package]
name = "usermgr-fuzz"
version = "0.0.0"
publish = false
edition = "2024"

[workspace]

[package.metadata]
cargo-fuzz = true

[dependencies]
libfuzzer-sys = "0.4"
arbitrary = { version = "1.3", features = ["derive"] }

[dependencies.usermgr-directory]
path = "../crates/usermgr-directory"

[dependencies.usermgr-kerberos]
path = "../crates/usermgr-kerberos"

[dependencies.usermgr-core]
path = "../crates/usermgr-core"

[dependencies.usermgr-types]
path = "../crates/usermgr-types"

[[bin]]
name = "ldap_filter"
path = "fuzz_targets/ldap_filter.rs"
test = false
doc = false
bench = false

[[bin]]
name = "kadmin_principal"
path = "fuzz_targets/kadmin_principal.rs"
test = false
doc = false
bench = false

[[bin]]
name = "allocator_candidates"
path = "fuzz_targets/allocator_candidates.rs"
test = false
doc = false
bench = false
"#;
    fs::write(fuzz_dir.join("Cargo.toml"), cargo_toml)?;

    // Create ldap_filter fuzz target
    let ldap_filter = r#"#![no_main]

use libfuzzer_sys::fuzz_target;
use usermgr_directory::escape_filter_value;

fuzz_target!(|data: &str| {
    let _ = escape_filter_value(data);
});
"#;
    fs::write(fuzz_dir.join("fuzz_targets/ldap_filter.rs"), ldap_filter)?;

    // Create kadmin_principal fuzz target
    let kadmin_principal = r#"#![no_main]

use libfuzzer_sys::fuzz_target;
use usermgr_kerberos::parse_principal_output;

fuzz_target!(|data: &str| {
    let _ = parse_principal_output(data);
});
"#;
    fs::write(
        fuzz_dir.join("fuzz_targets/kadmin_principal.rs"),
        kadmin_principal,
    )?;

    // Create allocator_candidates fuzz target
    let allocator_candidates = r#"#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;
use usermgr_core::allocator::{possible_usernames, NameOptions};
use usermgr_types::model::UserRequest;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let request = UserRequest {
        first_name: u.arbitrary().unwrap_or(None),
        last_name: u.arbitrary().unwrap_or(None),
        username: u.arbitrary().unwrap_or(None),
        ..UserRequest::default()
    };
    let _ = possible_usernames(&request, &NameOptions::default());
});
"#;
    fs::write(
        fuzz_dir.join("fuzz_targets/allocator_candidates.rs"),
        allocator_candidates,
    )?;

    println!("✅ Fuzz infrastructure initialized.");
    println!("\nAvailable fuzz targets:");
    println!("  - ldap_filter           : Fuzz LDAP search-filter escaping");
    println!("  - kadmin_principal      : Fuzz kadmin get_principal output parsing");
    println!("  - allocator_candidates  : Fuzz username/groupname candidate generation");
    println!("\nTo run fuzzing:");
    println!("  cargo xtask fuzz ldap_filter --max-time 300");
    println!("\nNote: Fuzzing requires nightly Rust and cargo-fuzz:");
    println!("  rustup install nightly");
    println!("  cargo install cargo-fuzz");

    Ok(())
}

fn dist(sh: &Shell, target: Option<&str>, no_test: bool) -> Result<()> {
    println!("Building release artifacts...");

    if !no_test {
        println!("Running tests before build...");
        test(sh, None, false)?;
    }

    let dist_dir = sh.current_dir().join("target/dist");
    fs::create_dir_all(&dist_dir)?;

    // Build in release mode
    println!("Building release binaries...");
    if let Some(t) = target {
        cmd!(sh, "cargo build --release --target {t}").run()?;
    } else {
        cmd!(sh, "cargo build --release").run()?;
    }

    // Package each publishable crate
    println!("Packaging crates...");
    let crates = [
        "usermgr-types",
        "usermgr-directory",
        "usermgr-kerberos",
        "usermgr-auth",
        "usermgr-clients",
        "usermgr-core",
    ];

    for crate_name in &crates {
        cmd!(sh, "cargo package -p {crate_name} --allow-dirty").run()?;
    }

    println!("✅ Distribution artifacts built.");
    println!("   Release binaries: target/release/");
    println!("   Packages: target/package/");

    Ok(())
}

fn coverage(sh: &Shell, format: &str) -> Result<()> {
    println!("Running code coverage...");

    // Requires cargo-llvm-cov
    match format {
        "html" => {
            cmd!(sh, "cargo llvm-cov --all-features --html").run()?;
            println!("✅ Coverage report: target/llvm-cov/html/index.html");
        }
        "lcov" => {
            cmd!(
                sh,
                "cargo llvm-cov --all-features --lcov --output-path target/lcov.info"
            )
            .run()?;
            println!("✅ Coverage report: target/lcov.info");
        }
        "json" => {
            cmd!(
                sh,
                "cargo llvm-cov --all-features --json --output-path target/coverage.json"
            )
            .run()?;
            println!("✅ Coverage report: target/coverage.json");
        }
        _ => {
            bail!(
                "Unknown coverage format: {}. Use html, lcov, or json.",
                format
            );
        }
    }

    Ok(())
}

fn semver(sh: &Shell) -> Result<()> {
    println!("Checking for semver violations...");

    let crates = [
        "usermgr-types",
        "usermgr-directory",
        "usermgr-kerberos",
        "usermgr-auth",
        "usermgr-clients",
        "usermgr-core",
    ];

    for crate_name in &crates {
        println!("  Checking {crate_name}...");
        cmd!(sh, "cargo semver-checks check-release -p {crate_name}").run()?;
    }

    println!("✅ No semver violations detected.");
    Ok(())
}
