use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rasar")]
#[command(version)]
#[command(about = "List, extract and patch files inside asar archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  rasar list app.asar -v                         list files with sizes and offsets\n  \
  rasar extract app.asar package.json            print package.json to stdout\n  \
  rasar patch app.asar dist/main.js main.js      overwrite dist/main.js in place")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every path in the archive
    List {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Show size, offset and flags for each entry
        #[arg(short = 'v')]
        verbose: bool,
    },

    /// Extract one file's content
    Extract {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Path of the file inside the archive
        #[arg(value_name = "PATH")]
        path: String,

        /// Write to FILE instead of stdout
        #[arg(short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Overwrite an existing file in place with content of the same length
    Patch {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Path of the file inside the archive
        #[arg(value_name = "PATH")]
        path: String,

        /// File holding the new content, or '-' for stdin
        #[arg(value_name = "SOURCE")]
        source: String,
    },

    /// Show header fields and entry counts
    Info {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
    },
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter: `-qq` silences warnings too
    pub fn log_filter(&self) -> &str {
        if self.is_very_quiet() {
            "error"
        } else {
            &self.log_level
        }
    }
}
