//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `planbook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("planbook_core ping={}", planbook_core::ping());
    println!("planbook_core version={}", planbook_core::core_version());
    println!(
        "planbook_core default_log_level={}",
        planbook_core::default_log_level()
    );
}
