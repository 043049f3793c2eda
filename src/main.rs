use std::io;

use color_eyre::Result;
use osh::{
    input::{self, InputMessage},
    Config, Shell, SubmitError, Submission,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[macro_use]
extern crate tracing;

fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, "osh.log"));
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")))
        .with(tracing_error::ErrorLayer::default())
        .init();

    guard
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = init_tracing(&config);

    color_eyre::install()?;

    trace!(?config, "starting");

    let interactive = termion::is_tty(&io::stdin());
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout();

    let mut shell = Shell::new(&config);

    loop {
        if interactive {
            input::prompt(&mut stdout, &shell.prompt)?;
        }

        let line = match input::read_line(&mut stdin)? {
            InputMessage::Line(line) => line,
            InputMessage::Invalid => {
                eprintln!("osh: input is not valid UTF-8, line ignored");
                continue;
            }
            InputMessage::Exit => break,
            InputMessage::Eof => {
                if interactive {
                    println!();
                }
                break;
            }
        };

        match shell.submit(&line) {
            Ok(Submission::Completed(report)) => {
                trace!(spawned = report.spawned(), "pipeline completed");
            }
            Ok(Submission::Skipped) => {}
            Err(err @ (SubmitError::Parse(_) | SubmitError::Exec(_))) => {
                eprintln!("osh: {err}");
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    shell.shutdown();

    Ok(())
}
