use cask_store::api::CONFIG;
use cask_store::missing::Missing;

pub fn print_missing(missing: &Missing) {
    if !missing.will_build.is_empty() {
        println!("these derivations will be built:");
        for p in &missing.will_build {
            println!("  {p}");
        }
    }

    if !missing.will_substitute.is_empty() {
        println!(
            "these paths will be fetched ({:.2} MiB download, {:.2} MiB unpacked):",
            missing.download_size as f64 / (1024.0 * 1024.0),
            missing.nar_size as f64 / (1024.0 * 1024.0),
        );
        for p in &missing.will_substitute {
            println!("  {p}");
        }
    }

    if !missing.unknown.is_empty() {
        println!(
            "don't know how to build these paths{}:",
            if CONFIG.read_only_mode {
                " (may be caused by read-only store access)"
            } else {
                ""
            }
        );
        for p in &missing.unknown {
            println!("  {p}");
        }
    }
}
