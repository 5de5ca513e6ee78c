#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::Error;
use owo_colors::OwoColorize;
use owo_colors::Stream;

use crate::application::cli;
use crate::application::cli::NoPermission;
use crate::application::repl;
use crate::configuration::Config;

fn handle_error(err: Error) {
    if let Some(denied) = err.downcast_ref::<NoPermission>() {
        eprintln!("{denied}");
        process::exit(1);
    }

    let text = format!(
        "Oh no! docfaq has failed with the following app version and error.\n\nVersion: {}\nBuilt: {}\nError: {}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_BUILD_DATE"),
        err
    );
    eprintln!(
        "{}",
        text.if_supports_color(Stream::Stderr, |e| return e.red())
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 RUST_LOG=docfaq {args}");
        eprintln!(
            "\nThe debug log is written to {}",
            Config::cache_dir().join("debug.log").to_string_lossy()
        );
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("DOCFAQ_LOG_DIR").unwrap_or_else(|_| {
        return Config::cache_dir().to_string_lossy().to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("docfaq")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let approach = match cli::parse().await {
        Ok(Some(approach)) => approach,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    if let Err(err) = repl::start(approach).await {
        handle_error(err);
    }

    // Stdin is read on a blocking thread that would keep the runtime alive.
    drop(guard);
    process::exit(0);
}
