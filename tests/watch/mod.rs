mod tailer_test;
mod watcher_test;
