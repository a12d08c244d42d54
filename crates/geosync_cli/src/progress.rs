//! Console progress output.

use geosync_sync::ProgressListener;

/// Prints push stages to stderr.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressListener for ConsoleProgress {
    fn started(&self, description: &str) {
        eprintln!("{}...", description);
    }

    fn progress(&self, done: u64, total: u64) {
        eprintln!("  {}/{}", done, total);
    }
}
