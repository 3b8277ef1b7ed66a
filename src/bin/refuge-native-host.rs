//! Chrome Native Messaging Host for Refuge
//!
//! This binary runs as a standalone native messaging host for the Refuge extension.
//! It communicates via stdin/stdout using Chrome's native messaging protocol,
//! so nothing else may ever be written to stdout.

#![allow(clippy::print_stderr, reason = "stderr is the only diagnostics channel a native host has")]

use refuge_lib::native_host::NativeHost;

fn main() {
    let sync = match refuge_lib::open_default() {
        Ok(sync) => sync,
        Err(e) => {
            eprintln!("Initialization error: {e}");
            std::process::exit(1);
        }
    };

    // Bring the exported rule set back in line with the store in case a
    // previous run died between pushing rules and saving entries
    if let Err(e) = sync.reconcile() {
        eprintln!("Failed to synchronize rules: {e}");
    }

    let host = NativeHost::new(sync);

    // EOF is expected when Chrome closes the connection
    if let Err(e) = host.run() {
        if e.kind() != std::io::ErrorKind::UnexpectedEof {
            eprintln!("Native host error: {e}");
            std::process::exit(1);
        }
    }
}
