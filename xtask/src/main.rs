//! Development tasks for taprelay
//!
//! Usage:
//!   cargo xtask install     Install release binary to /usr/local/bin (requires sudo)
//!   cargo xtask uninstall   Remove binary from /usr/local/bin (requires sudo)
//!   cargo xtask dist        Build release binary for distribution
//!   cargo xtask man         Generate man pages

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

// Same definitions the binary parses; only the clap metadata is used here
#[allow(dead_code)]
mod cli {
    include!("../../src/cli.rs");
}

const INSTALL_PATH: &str = "/usr/local/bin/taprelay";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match args[0].as_str() {
        "install" => install(),
        "uninstall" => uninstall(),
        "dist" => dist(),
        "man" => man(),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
taprelay development tasks

Usage: cargo xtask <COMMAND>

Commands:
  install    Build release binary and install to /usr/local/bin (requires sudo)
  uninstall  Remove taprelay from /usr/local/bin (requires sudo)
  dist       Build optimized release binary for distribution
  man        Generate man pages into target/man

Examples:
  cargo xtask install     # Build and install
  cargo xtask man         # Render taprelay.1 and taprelay-<command>.1
  cargo xtask uninstall   # Remove installed binary
"#
    );
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

fn cargo_release(root: &Path) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .current_dir(root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }
    Ok(())
}

fn release_binary(root: &Path) -> anyhow::Result<PathBuf> {
    let binary = root.join("target/release/taprelay");
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    Ok(binary)
}

/// Build release binary and install to /usr/local/bin
fn install() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building release binary...");
    cargo_release(&root)?;
    let binary = release_binary(&root)?;

    println!("==> Installing to {}...", INSTALL_PATH);

    let status = Command::new("sudo")
        .arg("install")
        .arg("-Dm755")
        .arg(&binary)
        .arg(INSTALL_PATH)
        .status()?;

    if !status.success() {
        anyhow::bail!("Install failed (sudo required)");
    }

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", INSTALL_PATH);

    // Show version
    let _ = Command::new(INSTALL_PATH).arg("--version").status();

    Ok(())
}

/// Remove taprelay from /usr/local/bin
fn uninstall() -> anyhow::Result<()> {
    println!("==> Removing {}...", INSTALL_PATH);

    let status = Command::new("sudo")
        .args(["rm", "-f", INSTALL_PATH])
        .status()?;

    if !status.success() {
        anyhow::bail!("Uninstall failed (sudo required)");
    }

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Build optimized release binary for distribution
fn dist() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building distribution binary...");
    cargo_release(&root)?;

    let binary = release_binary(&root)?;
    println!("==> Built: {:?}", binary);

    // Show binary info
    let _ = Command::new("ls").arg("-lh").arg(&binary).status();
    let _ = Command::new(&binary).arg("--version").status();

    Ok(())
}

/// Render taprelay.1 and one page per subcommand into target/man
fn man() -> anyhow::Result<()> {
    let out = project_root()?.join("target/man");
    std::fs::create_dir_all(&out)?;

    let cmd = cli::Cli::command();
    let mut pages = vec![("taprelay.1".to_string(), cmd.clone())];
    for subcommand in cmd.get_subcommands() {
        if subcommand.get_name() == "help" {
            continue;
        }
        pages.push((
            format!("taprelay-{}.1", subcommand.get_name()),
            subcommand.clone(),
        ));
    }

    for (name, page) in &pages {
        let mut file = File::create(out.join(name))?;
        Man::new(page.clone()).render(&mut file)?;
    }

    println!("==> {} man pages in {:?}", pages.len(), out);
    Ok(())
}
