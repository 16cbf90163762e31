// Extractor implementations
//
// The yt-dlp command line is the only backend. It can be launched as the
// native binary or as `python -m yt_dlp` when only the module is installed.

mod cli;

pub use cli::CliExtractor;
