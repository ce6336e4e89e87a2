// Readers for downloader output
//
// - output: one progress/log line at a time, dispatched on the subsystem tag
// - item: one `--dump-json` metadata record at a time

pub mod item;
pub mod output;

pub use item::parse_item;
pub use output::{parse_line, ProgressEvent, ProgressStatus};
