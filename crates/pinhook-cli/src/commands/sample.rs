//! Sample command - print a starter configuration.

use pinhook_config::SAMPLE_CONFIG;

/// Print the starter document to stdout.
pub(crate) fn print_sample() {
    print!("{SAMPLE_CONFIG}");
}

