//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("Pitlane - WebAssembly decision-module host");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  pitlane-core   Request/response types, errors, module fetching");
    println!("  pitlane-host   Runtime, host imports, ABI adapters, registry");
    println!("  pitlane-cli    Command-line interface");
    println!();
    println!("ABI variants:");
    println!("  buffer_shared   process() over shared f64 buffers");
    println!("  scalar_pointer  process(9 scalars, out_ptr) writing a 12-byte record");
    println!("  scalar_packed   process(9 scalars) -> i32 bitfield");

    Ok(())
}
