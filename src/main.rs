use account_normalizer::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use account_normalizer::{cli, logging};
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    let guard = match logging::init(&args.command) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("[WARNING] logging disabled: {:#}", err);
            None
        }
    };

    if let Err(err) = cli::run(args).await {
        match err.downcast_ref::<AppError>() {
            Some(app_error) => DefaultErrorReporter.report_error(app_error),
            None => eprintln!("[ERROR] {:#}", err),
        }
        // flush the non-blocking file writer before exiting
        drop(guard);
        std::process::exit(1);
    }
}
