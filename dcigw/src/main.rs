// SPDX-License-Identifier: AGPL-3.0-or-later

mod api;
mod bridge;
mod config;
mod dto;
mod inject;
mod packet;
mod version;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use daemonize::Daemonize;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use api::UdsBgp;
use bridge::{Bridge, Message};
use config::{Config, vrf_diff};
use version::VersionInfo;

#[derive(Debug, Clone)]
pub enum LoggingOutput {
    Stdout,
    Syslog,
    File(String),
}

#[derive(Parser)]
#[command(author, version, about = "L3VPN / EVPN type-5 redistribution gateway", long_about = None)]
struct Arg {
    #[arg(short = 'f', long, help = "Path to YAML config file")]
    config: PathBuf,

    #[arg(short, long, default_value = "info", help = "Default log level")]
    log_level: String,

    #[arg(short, long, help = "Run as daemon in background")]
    daemon: bool,
}

pub fn setup_tracing(output: LoggingOutput, default_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match output {
        LoggingOutput::Stdout => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
        LoggingOutput::Syslog => {
            use std::io::Write;
            use std::sync::Mutex;
            use syslog::{Facility, Formatter3164};

            struct SyslogWriter {
                logger: Mutex<syslog::Logger<syslog::LoggerBackend, Formatter3164>>,
            }

            impl Write for SyslogWriter {
                fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                    if let Ok(mut logger) = self.logger.lock() {
                        let msg = String::from_utf8_lossy(buf);
                        let _ = logger.info(msg.trim());
                    }
                    Ok(buf.len())
                }

                fn flush(&mut self) -> io::Result<()> {
                    Ok(())
                }
            }

            let formatter = Formatter3164 {
                facility: Facility::LOG_DAEMON,
                hostname: None,
                process: "dcigw".to_string(),
                pid: std::process::id(),
            };
            let logger = syslog::unix(formatter)
                .map_err(|e| anyhow::anyhow!("failed to connect to syslog: {e}"))?;
            let writer = SyslogWriter {
                logger: Mutex::new(logger),
            };
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(writer))
                .with_target(false)
                .with_ansi(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LoggingOutput::File(path) => {
            let path = std::path::Path::new(&path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path {}", path.display()))?;
            let writer = rolling::never(dir, file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
    Ok(())
}

fn tracing_set(daemon_mode: bool, default_level: &str) {
    if daemon_mode {
        // Daemon mode prefers syslog, falling back to a file.
        setup_tracing(LoggingOutput::Syslog, default_level).unwrap_or_else(|e| {
            eprintln!("Failed to setup syslog logging: {e}, falling back to file");
            setup_tracing(
                LoggingOutput::File("/var/log/dcigw.log".to_string()),
                default_level,
            )
            .unwrap_or_else(|e| {
                eprintln!("Failed to setup file logging: {e}, discarding logs");
                tracing_subscriber::fmt().with_writer(io::sink).init();
            });
        });
    } else {
        setup_tracing(LoggingOutput::Stdout, default_level).unwrap_or_else(|e| {
            eprintln!("Failed to setup stdout logging: {e}");
            tracing_subscriber::fmt().init();
        });
    }
}

fn daemonize() -> anyhow::Result<()> {
    let daemonize = Daemonize::new()
        .pid_file("/var/run/dcigw.pid")
        .working_directory("/")
        .umask(0o027);

    match daemonize.start() {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to daemonize: {e}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let arg = Arg::parse();

    if arg.daemon {
        daemonize()?;
    }
    tracing_set(arg.daemon, &arg.log_level);

    // A broken initial config is fatal; reload failures later are not.
    let config = Config::load(&arg.config)?;
    let mut bindings = config.bindings()?;

    let api = Arc::new(UdsBgp::connect(config.api.socket.clone()).await?);
    let bridge = Bridge::new(api, bindings.clone());
    bridge.subscribe().await?;
    let ctl = bridge::serve(bridge);

    info!("{} started", VersionInfo::current().short_version());

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                match Config::load(&arg.config).and_then(|config| config.bindings()) {
                    Ok(reloaded) => {
                        let diff = vrf_diff(&bindings, &reloaded);
                        if diff.is_empty() {
                            info!("config reload: no vrf changes");
                            continue;
                        }
                        bindings = reloaded;
                        if ctl.send(Message::Reload(diff)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => error!("config reload failed, keeping previous config: {err}"),
                }
            }
        }
    }

    let _ = ctl.send(Message::Stop).await;
    Ok(())
}
