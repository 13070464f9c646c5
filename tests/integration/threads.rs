#[path = "common/mod.rs"]
mod common;

use std::thread;

use cli_template::{lifecycle::Lifecycle, logging::LoggingContext};
use common::{END_MARKER, START_MARKER, position_of, read_lines, workspace};
use tracing::{error, info};

#[test]
fn events_from_spawned_threads_reach_the_log_file() {
    let temp = workspace("[logging]\nlog_file = threads.log\n");
    let dir = temp.path();

    let logging = LoggingContext::silent();
    logging.init_global().expect("no global subscriber yet");

    let report = Lifecycle::new(dir.join("config.ini"), logging)
        .working_dir(dir)
        .run(|_| {
            info!("main thread event");
            thread::spawn(|| error!("worker thread event"))
                .join()
                .expect("worker thread panicked");
            Ok(0)
        });
    assert_eq!(report.exit_code, 0);

    let lines = read_lines(&dir.join("threads.log"));
    let start = position_of(&lines, START_MARKER).expect("START marker present");
    let main = position_of(&lines, "INFO threads main thread event").expect("main thread line");
    let worker = position_of(&lines, "ERROR threads worker thread event").expect("worker line");
    let end = position_of(&lines, END_MARKER).expect("END marker present");
    assert!(start < main && main < worker && worker < end);

    thread::spawn(|| error!("after the run"))
        .join()
        .expect("worker thread panicked");
    let lines = read_lines(&dir.join("threads.log"));
    assert!(position_of(&lines, "after the run").is_none());
}
