use std::process;

use cli_template::{app, cli::parse_args, lifecycle::Lifecycle, logging::LoggingContext};

fn main() {
    let args = parse_args();
    let logging = init_logging();

    let report = Lifecycle::new(&args.config, logging).run(app::main_logic);
    process::exit(report.exit_code);
}

fn init_logging() -> LoggingContext {
    let logging = LoggingContext::console();
    let _ = logging.init_global();
    logging
}
